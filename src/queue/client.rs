use super::{
    fsm::{JobEvent, JobStateMachine},
    kind::{JobKind, JobProfile},
    transport::QueueTransport,
    types::{GenerationResult, JobHandle, JobStatus, QueueResponse},
};
use crate::{Error, Result, config::Config, params::GenerationRequest, proxy::ProxiedRequest};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Submits generation requests to the queue and polls them to a terminal state.
pub struct JobClient {
    transport: Arc<dyn QueueTransport>,
    image: JobProfile,
    video: JobProfile,
    poll_interval: Duration,
    cancel_on_timeout: bool,
}

impl JobClient {
    pub fn new(transport: Arc<dyn QueueTransport>, config: &Config) -> Self {
        let base = &config.upstream.queue_base_url;
        Self {
            transport,
            image: JobProfile::from_config(JobKind::Image, base, &config.models, &config.polling),
            video: JobProfile::from_config(JobKind::Video, base, &config.models, &config.polling),
            poll_interval: Duration::from_millis(config.polling.interval_ms),
            cancel_on_timeout: config.polling.cancel_on_timeout,
        }
    }

    pub fn with_profiles(
        transport: Arc<dyn QueueTransport>,
        image: JobProfile,
        video: JobProfile,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            image,
            video,
            poll_interval,
            cancel_on_timeout: false,
        }
    }

    pub fn cancel_on_timeout(mut self, enabled: bool) -> Self {
        self.cancel_on_timeout = enabled;
        self
    }

    pub fn profile(&self, kind: JobKind) -> &JobProfile {
        match kind {
            JobKind::Image => &self.image,
            JobKind::Video => &self.video,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Submits, polls and resolves one request. The token stops the loop early.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                request_id: "unsubmitted".to_string(),
            });
        }

        // Once the POST is on the wire the upstream may have accepted the job,
        // so submission always runs to completion to obtain a cancellable handle.
        let (handle, first) = self.submit(request).await?;
        if cancel.is_cancelled() {
            let mut machine = JobStateMachine::new(handle.request_id.clone());
            return self.abandon(&handle, &mut machine).await;
        }
        self.poll(&handle, first, cancel).await
    }

    /// Posts the normalized payload to the queue. The response doubles as the first
    /// status observation.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<(JobHandle, QueueResponse)> {
        let payload = request.to_payload()?;
        let profile = self.profile(request.kind());

        let raw = self
            .transport
            .send(ProxiedRequest::post_json(profile.submit_url(), &payload)?)
            .await?;
        let response = parse_queue_response(raw)?;

        let request_id = response
            .request_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Error::UnexpectedResult("queue submission response missing request_id".to_string())
            })?;

        let handle = JobHandle {
            kind: profile.kind,
            status_url: response
                .status_url
                .clone()
                .unwrap_or_else(|| profile.status_url(&request_id)),
            cancel_url: response
                .cancel_url
                .clone()
                .unwrap_or_else(|| profile.cancel_url(&request_id)),
            queue_position: response.queue_position,
            request_id,
        };

        info!(
            kind = %handle.kind,
            request_id = %handle.request_id,
            status = %response.status,
            "generation job submitted"
        );

        Ok((handle, response))
    }

    /// Drives a submitted job until it completes, fails, times out or is cancelled.
    pub async fn poll(
        &self,
        handle: &JobHandle,
        first: QueueResponse,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        let profile = self.profile(handle.kind);
        let started = Instant::now();
        let mut machine = JobStateMachine::new(handle.request_id.clone());
        machine.transition(JobEvent::from_status(&first.job_status()))?;

        let mut observation = Some(first);
        let mut attempts: u32 = 0;

        loop {
            if let Some(current) = observation.take() {
                match current.job_status() {
                    JobStatus::Queued(position) => {
                        debug!(
                            request_id = %handle.request_id,
                            attempt = attempts,
                            queue_position = ?position,
                            "job queued"
                        );
                    }
                    JobStatus::Running => {
                        debug!(request_id = %handle.request_id, attempt = attempts, "job running");
                    }
                    JobStatus::Completed(response_url) => {
                        let fetched = tokio::select! {
                            _ = cancel.cancelled() => {
                                return self.abandon(handle, &mut machine).await;
                            }
                            fetched = self.fetch_result(handle, response_url.as_deref()) => fetched,
                        };
                        match fetched {
                            Ok(Some(result)) => {
                                machine.transition(JobEvent::ResultReady)?;
                                info!(
                                    kind = %handle.kind,
                                    request_id = %handle.request_id,
                                    attempts = attempts,
                                    elapsed_ms = started.elapsed().as_millis() as u64,
                                    "generation job completed"
                                );
                                return Ok(result);
                            }
                            Ok(None) => {
                                debug!(
                                    request_id = %handle.request_id,
                                    "job completed but no assets listed yet"
                                );
                            }
                            Err(e) if is_fatal(&e) => {
                                machine.transition(JobEvent::Errored)?;
                                return Err(e);
                            }
                            Err(e) => {
                                warn!(
                                    request_id = %handle.request_id,
                                    attempt = attempts,
                                    "result fetch failed, continuing to poll: {e}"
                                );
                            }
                        }
                    }
                    JobStatus::Failed(reason) => {
                        warn!(request_id = %handle.request_id, "generation job failed: {reason}");
                        return Err(Error::JobFailed {
                            request_id: handle.request_id.clone(),
                            reason,
                        });
                    }
                }
            }

            if attempts >= profile.max_attempts {
                machine.transition(JobEvent::AttemptsExhausted)?;
                warn!(
                    kind = %handle.kind,
                    request_id = %handle.request_id,
                    attempts = attempts,
                    "generation job timed out"
                );
                if self.cancel_on_timeout {
                    if let Err(e) = self.cancel(handle).await {
                        warn!(request_id = %handle.request_id, "upstream cancel failed: {e}");
                    }
                }
                return Err(Error::Timeout {
                    request_id: handle.request_id.clone(),
                    attempts,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => return self.abandon(handle, &mut machine).await,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
            attempts += 1;

            let polled = tokio::select! {
                _ = cancel.cancelled() => return self.abandon(handle, &mut machine).await,
                polled = self.transport.send(ProxiedRequest::get(&handle.status_url)) => polled,
            };

            match polled.and_then(parse_queue_response) {
                Ok(response) => {
                    machine.transition(JobEvent::from_status(&response.job_status()))?;
                    observation = Some(response);
                }
                Err(e) if e.is_client_error() => {
                    machine.transition(JobEvent::Errored)?;
                    warn!(request_id = %handle.request_id, "poll rejected: {e}");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        request_id = %handle.request_id,
                        attempt = attempts,
                        "poll failed, will retry: {e}"
                    );
                }
            }
        }
    }

    /// Fetches the final payload from `response_url`, or from the canonical
    /// resource-by-id endpoint when none was reported.
    pub async fn fetch_result(
        &self,
        handle: &JobHandle,
        response_url: Option<&str>,
    ) -> Result<Option<GenerationResult>> {
        let profile = self.profile(handle.kind);
        let url = match response_url {
            Some(url) => url.to_string(),
            None => profile.result_url(&handle.request_id),
        };

        let payload = self.transport.send(ProxiedRequest::get(url)).await?;
        handle.kind.extract(&handle.request_id, &payload)
    }

    /// Asks the upstream to drop the job. Not retried.
    pub async fn cancel(&self, handle: &JobHandle) -> Result<()> {
        self.transport
            .send(ProxiedRequest::put(&handle.cancel_url))
            .await?;
        info!(request_id = %handle.request_id, "upstream cancellation requested");
        Ok(())
    }

    async fn abandon(
        &self,
        handle: &JobHandle,
        machine: &mut JobStateMachine,
    ) -> Result<GenerationResult> {
        machine.transition(JobEvent::CancelRequested)?;
        if let Err(e) = self.cancel(handle).await {
            warn!(request_id = %handle.request_id, "upstream cancel failed: {e}");
        }
        Err(Error::Cancelled {
            request_id: handle.request_id.clone(),
        })
    }
}

/// Errors that a later attempt cannot fix: malformed results and requests the
/// proxy refused before reaching the upstream.
fn is_fatal(err: &Error) -> bool {
    matches!(err, Error::UnexpectedResult(_)) || err.is_client_error()
}

fn parse_queue_response(raw: Value) -> Result<QueueResponse> {
    serde_json::from_value(raw)
        .map_err(|e| Error::UnexpectedResult(format!("malformed queue response: {e}")))
}
