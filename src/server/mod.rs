mod handlers;
mod types;

pub use handlers::AppState;
pub use types::*;

use crate::{Result, config::{Config, Credential}};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{any, delete, post},
};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/fal/proxy", any(handlers::proxy))
        .route(
            "/api/fal/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/fal/generate-image", post(handlers::generate_image))
        .route("/api/fal/generate-video", post(handlers::generate_video))
        .route("/api/ai/enhance-prompt", post(handlers::enhance_prompt))
        .route("/api/jobs/:workflow", delete(handlers::cancel_job))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run(config: Config, credential: Credential) -> Result<()> {
    if !credential.is_present() {
        warn!(
            "{} is not set; proxied requests will fail until it is configured",
            config.upstream.api_key_env
        );
    }

    let state = AppState::from_config(&config, credential)?;
    let app = router(state, config.server.max_upload_bytes);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
