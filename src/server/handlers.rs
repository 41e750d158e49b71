use super::types::{
    DEFAULT_WORKFLOW, EnhancePromptRequest, EnhancePromptResponse, ErrorResponse,
    GenerateImageRequest, GenerateImageResponse, GenerateVideoRequest, GenerateVideoResponse,
};
use crate::{
    Error, Result,
    config::{Config, Credential},
    llm::PromptEnhancer,
    params::GenerationRequest,
    proxy::{CredentialProxy, ProxiedRequest},
    queue::{GenerationResult, JobClient, JobSlots, ShieldedTransport},
    upload::{UploadRelay, UploadedFile},
};
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

type HandlerError = (StatusCode, Json<ErrorResponse>);

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<CredentialProxy>,
    pub uploads: UploadRelay,
    pub jobs: Arc<JobClient>,
    pub slots: JobSlots,
    pub enhancer: Arc<PromptEnhancer>,
}

impl AppState {
    /// Wires the generate routes to the in-process proxy so they share its host policy and secret.
    pub fn from_config(config: &Config, credential: Credential) -> Result<Self> {
        let proxy = Arc::new(CredentialProxy::new(&config.upstream, credential)?);
        let transport = Arc::new(ShieldedTransport::new(proxy.clone()));

        Ok(Self {
            uploads: UploadRelay::new(proxy.clone(), config.upstream.upload_url.clone()),
            jobs: Arc::new(JobClient::new(transport, config)),
            slots: JobSlots::new(),
            enhancer: Arc::new(PromptEnhancer::new(config.llm.as_ref())),
            proxy,
        })
    }
}

fn reject(err: Error) -> HandlerError {
    respond(err.status_code(), err.to_string())
}

fn respond(status: StatusCode, message: String) -> HandlerError {
    if status.is_server_error() {
        error!("Request failed with {}: {}", status.as_u16(), message);
    } else {
        warn!("Request rejected with {}: {}", status.as_u16(), message);
    }
    (status, Json(ErrorResponse { error: message }))
}

pub async fn proxy(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match ProxiedRequest::from_parts(&method, headers, body) {
        Ok(request) => request,
        Err(e) => return reject(e).into_response(),
    };

    match state.proxy.forward(request).await {
        Ok(upstream) => (upstream.status, upstream.headers, upstream.body).into_response(),
        Err(Error::Network(e)) => {
            error!("Proxy forward failed: {}", e);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error: Failed to proxy request".to_string(),
            )
            .into_response()
        }
        Err(e) => reject(e).into_response(),
    }
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<Value>, HandlerError> {
    state.proxy.require_credential().map_err(reject)?;

    let mut multipart = multipart.map_err(|rejection| {
        reject(Error::invalid_request(format!(
            "expected multipart/form-data: {}",
            rejection.body_text()
        )))
    })?;
    let file = UploadedFile::from_multipart(&mut multipart)
        .await
        .map_err(reject)?;

    match state.uploads.relay(file).await {
        Ok(result) => Ok(Json(result)),
        Err(Error::Upstream { status, body }) => Err(respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Upload failed: {status} - {body}"),
        )),
        Err(e) => Err(reject(e)),
    }
}

pub async fn generate_image(
    State(state): State<AppState>,
    Json(request): Json<GenerateImageRequest>,
) -> std::result::Result<Json<GenerateImageResponse>, HandlerError> {
    let result = generate(
        &state,
        request.workflow,
        GenerationRequest::Image(request.params),
    )
    .await?;
    Ok(Json(result.into()))
}

pub async fn generate_video(
    State(state): State<AppState>,
    Json(request): Json<GenerateVideoRequest>,
) -> std::result::Result<Json<GenerateVideoResponse>, HandlerError> {
    let result = generate(
        &state,
        request.workflow,
        GenerationRequest::Video(request.params),
    )
    .await?;
    Ok(Json(result.into()))
}

async fn generate(
    state: &AppState,
    workflow: Option<String>,
    request: GenerationRequest,
) -> std::result::Result<GenerationResult, HandlerError> {
    // Bad input must not evict the job already running in this slot.
    request.validate().map_err(reject)?;

    let workflow = workflow
        .filter(|w| !w.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_WORKFLOW.to_string());

    info!(workflow = %workflow, kind = %request.kind(), "Received generation request");

    let slot = state.slots.begin(&workflow);
    let result = state.jobs.run(&request, slot.token()).await;
    drop(slot);

    result.map_err(reject)
}

pub async fn enhance_prompt(
    State(state): State<AppState>,
    Json(request): Json<EnhancePromptRequest>,
) -> std::result::Result<Json<EnhancePromptResponse>, HandlerError> {
    let prompt = request.prompt.unwrap_or_default();
    let enhanced_prompt = state.enhancer.enhance(&prompt).await.map_err(reject)?;
    Ok(Json(EnhancePromptResponse { enhanced_prompt }))
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(workflow): Path<String>,
) -> std::result::Result<StatusCode, HandlerError> {
    if state.slots.cancel(&workflow) {
        info!(workflow = %workflow, "Cancelled in-flight job");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No job in flight for workflow '{workflow}'"),
            }),
        ))
    }
}
