mod policy;
mod types;

pub use policy::HostPolicy;
pub use types::{
    ProxiedRequest, ProxiedResponse, ProxyMethod, TARGET_URL_HEADER, relayable_headers,
};

use crate::{
    Error, Result,
    config::{Credential, UpstreamConfig},
};
use axum::http::header;
use std::time::Duration;
use tracing::{debug, info};

/// The only component that attaches the server-held secret to outbound traffic.
#[derive(Debug, Clone)]
pub struct CredentialProxy {
    client: reqwest::Client,
    policy: HostPolicy,
    credential: Credential,
    credential_name: String,
    auth_scheme: String,
}

impl CredentialProxy {
    pub fn new(config: &UpstreamConfig, credential: Credential) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config, credential))
    }

    pub fn with_client(
        client: reqwest::Client,
        config: &UpstreamConfig,
        credential: Credential,
    ) -> Self {
        Self {
            client,
            policy: HostPolicy::new(&config.allowed_hosts),
            credential,
            credential_name: config.api_key_env.clone(),
            auth_scheme: config.auth_scheme.clone(),
        }
    }

    pub fn policy(&self) -> &HostPolicy {
        &self.policy
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fails with the configuration error when no secret is available.
    pub fn require_credential(&self) -> Result<()> {
        self.authorization().map(|_| ())
    }

    /// Value of the `Authorization` header, e.g. `Key <secret>`.
    pub fn authorization(&self) -> Result<String> {
        let secret = self
            .credential
            .secret()
            .ok_or_else(|| Error::MissingCredential(self.credential_name.clone()))?;
        Ok(format!("{} {}", self.auth_scheme, secret))
    }

    /// Runs every precondition check without touching the network.
    pub fn validate(&self, request: &ProxiedRequest) -> Result<reqwest::Url> {
        let url = self.policy.check(&request.target)?;

        if request.method == ProxyMethod::Post {
            if let Some(content_type) = request.content_type() {
                if !content_type.contains("application/json") {
                    return Err(Error::UnsupportedMediaType(content_type.to_string()));
                }
            }
            if let Some(body) = &request.body {
                serde_json::from_slice::<serde_json::Value>(body).map_err(|e| {
                    Error::invalid_request(format!("request body must be valid JSON: {e}"))
                })?;
            }
        }

        Ok(url)
    }

    /// Forwards the request with the secret attached and relays the upstream answer untouched.
    pub async fn forward(&self, request: ProxiedRequest) -> Result<ProxiedResponse> {
        let url = self.validate(&request)?;
        let authorization = self.authorization()?;

        debug!("Proxying {:?} to {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.as_http(), url.clone())
            .header(header::AUTHORIZATION, authorization);

        if request.method == ProxyMethod::Post {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            if let Some(body) = request.body {
                builder = builder.body(body);
            }
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = relayable_headers(response.headers());
        let body = response.bytes().await?;

        info!(
            "Proxied {:?} {} -> {}",
            request.method,
            url.path(),
            status.as_u16()
        );

        Ok(ProxiedResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        http::{HeaderMap, HeaderValue},
    };

    fn proxy(credential: Credential) -> CredentialProxy {
        CredentialProxy::with_client(
            reqwest::Client::new(),
            &UpstreamConfig::default(),
            credential,
        )
    }

    fn post(target: &str, content_type: &'static str, body: &'static str) -> ProxiedRequest {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        ProxiedRequest {
            target: target.to_string(),
            method: ProxyMethod::Post,
            headers,
            body: Some(Bytes::from_static(body.as_bytes())),
        }
    }

    #[test]
    fn test_authorization_uses_configured_scheme() {
        let proxy = proxy(Credential::new("abc:123"));
        assert_eq!(proxy.authorization().unwrap(), "Key abc:123");
    }

    #[test]
    fn test_authorization_without_secret_is_configuration_error() {
        let err = proxy(Credential::missing()).authorization().unwrap_err();
        assert!(matches!(err, Error::MissingCredential(ref name) if name == "FAL_KEY"));
    }

    #[test]
    fn test_validate_rejects_non_json_post() {
        let request = post("https://queue.fal.run/x", "text/plain", "hello");
        let err = proxy(Credential::new("k")).validate(&request).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_validate_rejects_malformed_json_body() {
        let request = post("https://queue.fal.run/x", "application/json", "{not json");
        let err = proxy(Credential::new("k")).validate(&request).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_validate_checks_host_before_content_type() {
        let request = post("https://example.com/x", "text/plain", "hello");
        let err = proxy(Credential::new("k")).validate(&request).unwrap_err();
        assert!(matches!(err, Error::DisallowedHost { .. }));
    }

    #[tokio::test]
    async fn test_forward_fails_fast_without_secret() {
        let err = proxy(Credential::missing())
            .forward(ProxiedRequest::get("https://queue.fal.run/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));
    }
}
