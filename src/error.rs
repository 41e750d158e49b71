use axum::http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal Server Error: {0} not configured")]
    MissingCredential(String),

    #[error("Bad Request: x-fal-target-url header is required")]
    MissingTarget,

    #[error("Precondition Failed: Invalid URL")]
    InvalidTargetUrl(String),

    #[error("Precondition Failed: host '{host}' is not in the allowed set ({allowed})")]
    DisallowedHost { host: String, allowed: String },

    #[error("Unsupported Media Type: Only application/json is supported")]
    UnsupportedMediaType(String),

    #[error("Method Not Allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Bad Request: {0}")]
    InvalidRequest(String),

    #[error("Upstream error: {status} - {body}")]
    Upstream { status: u16, body: String },

    #[error("Proxy error: {status} - {body}")]
    Proxy { status: u16, body: String },

    #[error("Generation failed for request {request_id}: {reason}")]
    JobFailed { request_id: String, reason: String },

    #[error("Generation timeout after {attempts} attempts (request {request_id}). Please try again.")]
    Timeout { request_id: String, attempts: u32 },

    #[error("Generation cancelled (request {request_id})")]
    Cancelled { request_id: String },

    #[error("Invalid state transition: {current} -> {requested}")]
    InvalidTransition { current: String, requested: String },

    #[error("Unexpected result payload: {0}")]
    UnexpectedResult(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("OpenAI error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status surfaced to callers for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingTarget | Self::InvalidRequest(_) | Self::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidTargetUrl(_) | Self::DisallowedHost { .. } => {
                StatusCode::PRECONDITION_FAILED
            }
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::JobFailed { .. } | Self::UnexpectedResult(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Cancelled { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Precondition and input errors are rejected before any upstream traffic.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}
