//! Translation of UI-level generation parameters into the upstream queue payloads.

mod aspect;

pub use aspect::{AspectRatio, RATIO_TOLERANCE};

use crate::{Error, Result, queue::JobKind};
use rand::Rng;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub const DEFAULT_DIMENSION: u32 = 1024;
pub const DEFAULT_GUIDANCE_SCALE: f32 = 3.5;
pub const GUIDANCE_SCALE_RANGE: (f32, f32) = (1.0, 20.0);
pub const SEED_CEILING: u64 = 1_000_000;

/// Upstream safety tolerance level, sent as a string `"1"` (strictest) to `"6"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyTolerance(u8);

impl SafetyTolerance {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn new(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for SafetyTolerance {
    fn default() -> Self {
        Self(2)
    }
}

impl fmt::Display for SafetyTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for SafetyTolerance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoDuration {
    #[default]
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "10")]
    Ten,
}

/// Image generation parameters as the UI sends them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub guidance_scale: Option<f32>,
    #[serde(default)]
    pub safety_tolerance: Option<u8>,
    #[serde(default)]
    pub strength: Option<f32>,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Image-to-video parameters as the UI sends them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub duration: Option<VideoDuration>,
    #[serde(default)]
    pub prompt_optimizer: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImagePayload {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub aspect_ratio: AspectRatio,
    pub num_images: u32,
    pub output_format: &'static str,
    pub sync_mode: bool,
    pub safety_tolerance: SafetyTolerance,
    pub guidance_scale: f32,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoPayload {
    pub prompt: String,
    pub image_url: String,
    pub duration: VideoDuration,
    pub prompt_optimizer: bool,
}

/// A generation request of either kind. Immutable once handed to the job client.
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    Image(ImageRequest),
    Video(VideoRequest),
}

impl GenerationRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Image(_) => JobKind::Image,
            Self::Video(_) => JobKind::Video,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Image(request) => request.normalize().map(|_| ()),
            Self::Video(request) => request.normalize().map(|_| ()),
        }
    }

    /// Validates and normalizes into the JSON body submitted to the queue.
    pub fn to_payload(&self) -> Result<serde_json::Value> {
        let value = match self {
            Self::Image(request) => serde_json::to_value(request.normalize()?)?,
            Self::Video(request) => serde_json::to_value(request.normalize()?)?,
        };
        Ok(value)
    }
}

impl ImageRequest {
    pub fn normalize(&self) -> Result<ImagePayload> {
        let prompt = require_prompt(&self.prompt)?;
        let width = self.width.unwrap_or(DEFAULT_DIMENSION);
        let height = self.height.unwrap_or(DEFAULT_DIMENSION);

        Ok(ImagePayload {
            prompt,
            image_url: self.image_url.clone().filter(|u| !u.trim().is_empty()),
            aspect_ratio: AspectRatio::from_dimensions(width, height),
            num_images: 1,
            output_format: "jpeg",
            sync_mode: false,
            safety_tolerance: self
                .safety_tolerance
                .map(SafetyTolerance::new)
                .unwrap_or_default(),
            guidance_scale: guidance_scale(self.guidance_scale),
            seed: self.seed.unwrap_or_else(random_seed),
            strength: self
                .strength
                .filter(|s| s.is_finite())
                .map(|s| s.clamp(0.0, 1.0)),
        })
    }
}

impl VideoRequest {
    pub fn normalize(&self) -> Result<VideoPayload> {
        let prompt = require_prompt(&self.prompt)?;
        let image_url = self
            .image_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::invalid_request("A source image is required for video"))?;

        Ok(VideoPayload {
            prompt,
            image_url,
            duration: self.duration.unwrap_or_default(),
            prompt_optimizer: self.prompt_optimizer.unwrap_or(true),
        })
    }
}

fn require_prompt(prompt: &str) -> Result<String> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(Error::invalid_request("Prompt is required"));
    }
    Ok(prompt.to_string())
}

fn guidance_scale(requested: Option<f32>) -> f32 {
    let (min, max) = GUIDANCE_SCALE_RANGE;
    match requested {
        Some(value) if value.is_finite() => value.clamp(min, max),
        _ => DEFAULT_GUIDANCE_SCALE,
    }
}

fn random_seed() -> u64 {
    rand::thread_rng().gen_range(0..SEED_CEILING)
}
