use super::{LlmClient, OpenAiClient};
use crate::{Error, Result, config::LlmConfig};
use tracing::{debug, warn};

const ENHANCE_INSTRUCTION: &str = "You rewrite prompts for an image generation model. \
Make the user's prompt more detailed and artistic while keeping its core concept: \
add artistic style, lighting and composition details. \
Reply with the rewritten prompt only, without explanations or quotes.";

/// Rewrites prompts with an LLM. Falls back to the original prompt whenever
/// no model is configured or the call fails.
pub struct PromptEnhancer {
    client: Option<Box<dyn LlmClient>>,
}

impl PromptEnhancer {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        Self {
            client: config
                .cloned()
                .map(|c| Box::new(OpenAiClient::new(c)) as Box<dyn LlmClient>),
        }
    }

    pub fn with_client(client: Box<dyn LlmClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub async fn enhance(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::invalid_request("Prompt is required"));
        }

        let Some(client) = &self.client else {
            debug!("Prompt enhancement disabled, returning prompt unchanged");
            return Ok(prompt.to_string());
        };

        match client.complete(ENHANCE_INSTRUCTION, prompt).await {
            Ok(enhanced) => {
                let enhanced = enhanced.trim().trim_matches('"').trim();
                if enhanced.is_empty() {
                    Ok(prompt.to_string())
                } else {
                    Ok(enhanced.to_string())
                }
            }
            Err(e) => {
                warn!("Prompt enhancement failed, using original prompt: {}", e);
                Ok(prompt.to_string())
            }
        }
    }
}
