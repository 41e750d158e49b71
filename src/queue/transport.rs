use crate::{
    Error, Result,
    proxy::{CredentialProxy, ProxiedRequest, TARGET_URL_HEADER},
};
use async_trait::async_trait;
use axum::http::header;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// How the job client reaches the upstream queue. Every implementation routes through
/// the credential proxy; none of them lets the caller hold the secret.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    async fn send(&self, request: ProxiedRequest) -> Result<Value>;
}

fn parse_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Calls the credential proxy in-process. Used by the server's own routes.
#[derive(Debug, Clone)]
pub struct ShieldedTransport {
    proxy: Arc<CredentialProxy>,
}

impl ShieldedTransport {
    pub fn new(proxy: Arc<CredentialProxy>) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl QueueTransport for ShieldedTransport {
    async fn send(&self, request: ProxiedRequest) -> Result<Value> {
        let response = self.proxy.forward(request).await?;
        if !response.is_success() {
            return Err(Error::Upstream {
                status: response.status.as_u16(),
                body: response.body_text(),
            });
        }
        parse_body(&response.body)
    }
}

/// Calls a remote proxy endpoint over HTTP, naming the upstream in `x-fal-target-url`.
#[derive(Debug, Clone)]
pub struct ProxyTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl ProxyTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl QueueTransport for ProxyTransport {
    async fn send(&self, request: ProxiedRequest) -> Result<Value> {
        debug!(
            "Sending {:?} for {} via proxy {}",
            request.method, request.target, self.endpoint
        );

        let mut builder = self
            .client
            .request(request.method.as_http(), &self.endpoint)
            .header(TARGET_URL_HEADER, &request.target)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::Proxy {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        parse_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body_accepts_empty() {
        assert_eq!(parse_body(b"").unwrap(), Value::Null);
        assert_eq!(parse_body(b" \n").unwrap(), Value::Null);
        assert_eq!(parse_body(b"{\"a\":1}").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_parse_body_rejects_garbage() {
        assert!(matches!(parse_body(b"<html>"), Err(Error::Serialization(_))));
    }
}
