use crate::{
    params::{ImageRequest, VideoRequest},
    queue::GenerationResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WORKFLOW: &str = "default";

#[derive(Debug, Deserialize)]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(flatten)]
    pub params: ImageRequest,
}

#[derive(Debug, Deserialize)]
pub struct GenerateVideoRequest {
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(flatten)]
    pub params: VideoRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub image_url: String,
    pub request_id: String,
    pub seed: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_nsfw_concepts: Vec<bool>,
    pub completed_at: DateTime<Utc>,
}

impl From<GenerationResult> for GenerateImageResponse {
    fn from(result: GenerationResult) -> Self {
        let (width, height) = result
            .primary()
            .map(|asset| (asset.width, asset.height))
            .unwrap_or_default();
        Self {
            image_url: result.url,
            request_id: result.request_id,
            seed: result.seed,
            width,
            height,
            has_nsfw_concepts: result.has_nsfw_concepts,
            completed_at: result.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    pub video_url: String,
    pub request_id: String,
    pub completed_at: DateTime<Utc>,
}

impl From<GenerationResult> for GenerateVideoResponse {
    fn from(result: GenerationResult) -> Self {
        Self {
            video_url: result.url,
            request_id: result.request_id,
            completed_at: result.completed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EnhancePromptRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancePromptResponse {
    pub enhanced_prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
