use super::JobKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_IN_QUEUE: &str = "IN_QUEUE";
pub const STATUS_IN_PROGRESS: &str = "IN_PROGRESS";
pub const STATUS_COMPLETED: &str = "COMPLETED";

/// Body returned by the queue on submission and on every status poll.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueResponse {
    pub status: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub queue_position: Option<u32>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl QueueResponse {
    pub fn job_status(&self) -> JobStatus {
        match self.status.as_str() {
            STATUS_IN_QUEUE => JobStatus::Queued(self.queue_position),
            STATUS_IN_PROGRESS => JobStatus::Running,
            STATUS_COMPLETED => JobStatus::Completed(self.response_url.clone()),
            other => {
                let reason = match &self.error {
                    Some(Value::String(message)) => message.clone(),
                    Some(Value::Null) | None => format!("job {}", other.to_lowercase()),
                    Some(detail) => detail.to_string(),
                };
                JobStatus::Failed(reason)
            }
        }
    }
}

/// Latest observation of a job. Only the most recent poll matters.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Queued(Option<u32>),
    Running,
    /// Carries the `response_url` when the upstream reported one.
    Completed(Option<String>),
    Failed(String),
}

/// Identifier and URLs handed out by the queue for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct JobHandle {
    pub kind: JobKind,
    pub request_id: String,
    pub status_url: String,
    pub cancel_url: String,
    pub queue_position: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Final output of a job, handed to the caller once.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub kind: JobKind,
    pub request_id: String,
    /// First image, or the video.
    pub url: String,
    pub assets: Vec<Asset>,
    pub seed: Option<u64>,
    pub has_nsfw_concepts: Vec<bool>,
    pub completed_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn primary(&self) -> Option<&Asset> {
        self.assets.first()
    }
}
