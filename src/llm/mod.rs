mod client;
mod enhance;

pub use client::{LlmClient, OpenAiClient};
pub use enhance::PromptEnhancer;
