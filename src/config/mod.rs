mod types;

pub use types::*;

use crate::Result;
use std::env;
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(&config_path).await?;
    parse(&config_str)
}

pub fn parse(config_str: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(config_str)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.upstream.allowed_hosts.is_empty() {
        return Err(crate::Error::config(
            "upstream.allowed_hosts must list at least one host",
        ));
    }
    if config.polling.interval_ms == 0 {
        return Err(crate::Error::config("polling.interval_ms must be positive"));
    }
    if config.polling.image_max_attempts == 0 || config.polling.video_max_attempts == 0 {
        return Err(crate::Error::config(
            "polling attempt ceilings must be positive",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse("{}").unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upstream.allowed_hosts, vec!["*.fal.ai", "*.fal.run"]);
        assert_eq!(config.upstream.api_key_env, "FAL_KEY");
        assert_eq!(config.polling.interval_ms, 5_000);
        assert_eq!(config.polling.image_max_attempts, 60);
        assert_eq!(config.polling.video_max_attempts, 120);
        assert!(config.llm.is_none());
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let yaml = r#"
upstream:
  allowed_hosts: ["*.example.net"]
polling:
  interval_ms: 250
llm:
  api_key: sk-test
"#;
        let config = parse(yaml).unwrap();

        assert_eq!(config.upstream.allowed_hosts, vec!["*.example.net"]);
        assert_eq!(config.upstream.queue_base_url, "https://queue.fal.run");
        assert_eq!(config.polling.interval_ms, 250);
        assert_eq!(config.polling.video_max_attempts, 120);
        assert_eq!(config.llm.unwrap().model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_rejects_empty_allow_list() {
        let err = parse("upstream:\n  allowed_hosts: []\n").unwrap_err();
        assert!(err.to_string().contains("allowed_hosts"));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("super-secret");
        let rendered = format!("{:?}", credential);

        assert!(!rendered.contains("super-secret"));
        assert_eq!(credential.secret(), Some("super-secret"));
        assert!(!Credential::missing().is_present());
    }
}
