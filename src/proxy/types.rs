use crate::{Error, Result};
use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderName, Method, StatusCode, header},
};
use serde::de::DeserializeOwned;

/// Header naming the absolute upstream URL a proxied call is aimed at.
pub const TARGET_URL_HEADER: &str = "x-fal-target-url";

/// Response headers that describe the upstream framing and must not be relayed.
fn is_stripped(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "content-length"
            | "content-encoding"
            | "transfer-encoding"
            | "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "upgrade"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Post,
    /// Queue cancellation issued by the job client. Never accepted from inbound callers.
    Put,
}

impl ProxyMethod {
    /// Methods a caller of the public proxy route may use: GET and POST only.
    pub fn from_http(method: &Method) -> Result<Self> {
        if *method == Method::GET {
            Ok(Self::Get)
        } else if *method == Method::POST {
            Ok(Self::Post)
        } else {
            Err(Error::MethodNotAllowed(method.to_string()))
        }
    }

    pub fn as_http(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
        }
    }
}

/// One call through the credential proxy. Lives only for the duration of that call.
#[derive(Debug, Clone)]
pub struct ProxiedRequest {
    pub target: String,
    pub method: ProxyMethod,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ProxiedRequest {
    pub fn get(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: ProxyMethod::Get,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: ProxyMethod::Put,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn post_json(target: impl Into<String>, body: &serde_json::Value) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(Self {
            target: target.into(),
            method: ProxyMethod::Post,
            headers,
            body: Some(Bytes::from(serde_json::to_vec(body)?)),
        })
    }

    /// Builds a request from an inbound HTTP call, reading the target from its header.
    pub fn from_parts(method: &Method, headers: HeaderMap, body: Bytes) -> Result<Self> {
        let method = ProxyMethod::from_http(method)?;

        let target = headers
            .get(TARGET_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingTarget)?
            .to_string();

        let body = if body.is_empty() { None } else { Some(body) };

        Ok(Self {
            target,
            method,
            headers,
            body,
        })
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Upstream answer relayed back to the caller.
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxiedResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Copies upstream headers, dropping length/encoding framing and hop-by-hop headers.
pub fn relayable_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_stripped(name) {
            continue;
        }
        relayed.append(name.clone(), value.clone());
    }
    relayed
}
