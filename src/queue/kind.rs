use super::types::{Asset, GenerationResult};
use crate::{
    Error, Result,
    config::{ModelsConfig, PollingConfig},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Image,
    Video,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Video => f.write_str("video"),
        }
    }
}

impl JobKind {
    /// Extracts the result from a final payload.
    ///
    /// `Ok(None)` means the payload has no assets yet, which happens when the
    /// queue reports completion slightly before the listing is queryable.
    pub fn extract(self, request_id: &str, payload: &Value) -> Result<Option<GenerationResult>> {
        let assets = match self {
            Self::Image => match payload.get("images") {
                None | Some(Value::Null) => return Ok(None),
                Some(Value::Array(items)) if items.is_empty() => return Ok(None),
                Some(images @ Value::Array(_)) => {
                    serde_json::from_value::<Vec<Asset>>(images.clone()).map_err(|e| {
                        Error::UnexpectedResult(format!("malformed image list: {e}"))
                    })?
                }
                Some(other) => {
                    return Err(Error::UnexpectedResult(format!(
                        "expected an image array, got {other}"
                    )));
                }
            },
            Self::Video => match payload.get("video") {
                None | Some(Value::Null) => return Ok(None),
                Some(video @ Value::Object(_)) => {
                    let asset = serde_json::from_value::<Asset>(video.clone()).map_err(|e| {
                        Error::UnexpectedResult(format!("malformed video object: {e}"))
                    })?;
                    vec![asset]
                }
                Some(other) => {
                    return Err(Error::UnexpectedResult(format!(
                        "expected a video object, got {other}"
                    )));
                }
            },
        };

        let url = match assets.first() {
            Some(asset) => asset.url.clone(),
            None => return Ok(None),
        };

        let has_nsfw_concepts = payload
            .get("has_nsfw_concepts")
            .and_then(Value::as_array)
            .map(|flags| flags.iter().filter_map(Value::as_bool).collect())
            .unwrap_or_default();

        Ok(Some(GenerationResult {
            kind: self,
            request_id: request_id.to_string(),
            url,
            assets,
            seed: payload.get("seed").and_then(Value::as_u64),
            has_nsfw_concepts,
            completed_at: Utc::now(),
        }))
    }
}

/// Everything the polling engine needs to know about one kind of job.
#[derive(Debug, Clone)]
pub struct JobProfile {
    pub kind: JobKind,
    pub queue_base: String,
    pub model: String,
    pub max_attempts: u32,
}

impl JobProfile {
    pub fn new(
        kind: JobKind,
        queue_base: impl Into<String>,
        model: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            kind,
            queue_base: queue_base.into().trim_end_matches('/').to_string(),
            model: model.into().trim_matches('/').to_string(),
            max_attempts,
        }
    }

    pub fn from_config(
        kind: JobKind,
        queue_base: &str,
        models: &ModelsConfig,
        polling: &PollingConfig,
    ) -> Self {
        match kind {
            JobKind::Image => Self::new(kind, queue_base, &models.image, polling.image_max_attempts),
            JobKind::Video => Self::new(kind, queue_base, &models.video, polling.video_max_attempts),
        }
    }

    pub fn submit_url(&self) -> String {
        format!("{}/{}", self.queue_base, self.model)
    }

    /// Canonical resource-by-id endpoint, used when no `response_url` is reported.
    pub fn result_url(&self, request_id: &str) -> String {
        format!("{}/{}/requests/{}", self.queue_base, self.model, request_id)
    }

    pub fn status_url(&self, request_id: &str) -> String {
        format!("{}/status", self.result_url(request_id))
    }

    pub fn cancel_url(&self, request_id: &str) -> String {
        format!("{}/cancel", self.result_url(request_id))
    }
}
