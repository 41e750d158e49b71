use axum::Router;
use fal_gateway::{
    config::{Config, Credential, LogsConfig, ModelsConfig, PollingConfig, ServerConfig, UpstreamConfig},
    params::{GenerationRequest, ImageRequest, VideoRequest},
    queue::{JobKind, JobProfile},
    server::{self, AppState},
};

pub const TEST_SECRET: &str = "test-key";

/// Config pointed at a local fake upstream (e.g. a wiremock server uri).
pub fn create_test_config(upstream: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_upload_bytes: 1024 * 1024,
            logs: LogsConfig {
                level: "debug".to_string(),
            },
        },
        upstream: UpstreamConfig {
            allowed_hosts: vec!["127.0.0.1".to_string()],
            queue_base_url: upstream.to_string(),
            upload_url: format!("{upstream}/storage/upload"),
            ..UpstreamConfig::default()
        },
        models: ModelsConfig::default(),
        polling: PollingConfig {
            interval_ms: 10,
            image_max_attempts: 5,
            video_max_attempts: 5,
            cancel_on_timeout: false,
        },
        llm: None,
    }
}

pub fn create_test_state(config: &Config, credential: Credential) -> AppState {
    AppState::from_config(config, credential).expect("Failed to build app state")
}

pub fn create_test_app(config: &Config) -> Router {
    let state = create_test_state(config, Credential::new(TEST_SECRET));
    server::router(state, config.server.max_upload_bytes)
}

pub fn create_test_app_without_secret(config: &Config) -> Router {
    let state = create_test_state(config, Credential::missing());
    server::router(state, config.server.max_upload_bytes)
}

pub const QUEUE_BASE: &str = "https://queue.fal.run";
pub const IMAGE_MODEL: &str = "fal-ai/flux-pro/kontext";
pub const VIDEO_MODEL: &str = "fal-ai/minimax/hailuo-02/standard/image-to-video";

pub fn image_profile(max_attempts: u32) -> JobProfile {
    JobProfile::new(JobKind::Image, QUEUE_BASE, IMAGE_MODEL, max_attempts)
}

pub fn video_profile(max_attempts: u32) -> JobProfile {
    JobProfile::new(JobKind::Video, QUEUE_BASE, VIDEO_MODEL, max_attempts)
}

pub fn image_request(prompt: &str) -> GenerationRequest {
    GenerationRequest::Image(ImageRequest {
        prompt: prompt.to_string(),
        seed: Some(42),
        ..Default::default()
    })
}

pub fn video_request(prompt: &str, image_url: &str) -> GenerationRequest {
    GenerationRequest::Video(VideoRequest {
        prompt: prompt.to_string(),
        image_url: Some(image_url.to_string()),
        ..Default::default()
    })
}

/// `{QUEUE_BASE}/{IMAGE_MODEL}/requests/{id}` plus an optional suffix.
pub fn image_url(request_id: &str, suffix: &str) -> String {
    format!("{QUEUE_BASE}/{IMAGE_MODEL}/requests/{request_id}{suffix}")
}
