use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// `*.example.com` matches any subdomain, a bare entry matches the host exactly.
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
    #[serde(default = "default_queue_base_url")]
    pub queue_base_url: String,
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_image_model")]
    pub image: String,
    #[serde(default = "default_video_model")]
    pub video: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_image_max_attempts")]
    pub image_max_attempts: u32,
    #[serde(default = "default_video_max_attempts")]
    pub video_max_attempts: u32,
    #[serde(default)]
    pub cancel_on_timeout: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

/// Server-held secret for the upstream API. Never serialized, never printed.
#[derive(Clone, Default)]
pub struct Credential(Option<String>);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Some(secret.into()))
    }

    pub fn missing() -> Self {
        Self(None)
    }

    /// Reads the secret from the named environment variable. Empty values count as missing.
    pub fn from_env(var: &str) -> Self {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Self(Some(value)),
            _ => Self(None),
        }
    }

    pub fn secret(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Credential(<redacted>)"),
            None => f.write_str("Credential(<missing>)"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            logs: LogsConfig::default(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: default_allowed_hosts(),
            queue_base_url: default_queue_base_url(),
            upload_url: default_upload_url(),
            api_key_env: default_api_key_env(),
            auth_scheme: default_auth_scheme(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            image: default_image_model(),
            video: default_video_model(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            image_max_attempts: default_image_max_attempts(),
            video_max_attempts: default_video_max_attempts(),
            cancel_on_timeout: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_allowed_hosts() -> Vec<String> {
    vec!["*.fal.ai".to_string(), "*.fal.run".to_string()]
}

fn default_queue_base_url() -> String {
    "https://queue.fal.run".to_string()
}

fn default_upload_url() -> String {
    "https://fal.run/storage/upload".to_string()
}

fn default_api_key_env() -> String {
    "FAL_KEY".to_string()
}

fn default_auth_scheme() -> String {
    "Key".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_image_model() -> String {
    "fal-ai/flux-pro/kontext".to_string()
}

fn default_video_model() -> String {
    "fal-ai/minimax/hailuo-02/standard/image-to-video".to_string()
}

fn default_interval_ms() -> u64 {
    5_000
}

fn default_image_max_attempts() -> u32 {
    60
}

fn default_video_max_attempts() -> u32 {
    120
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}
