use async_trait::async_trait;
use fal_gateway::{
    Error, Result,
    llm::LlmClient,
    proxy::{ProxiedRequest, ProxyMethod},
    queue::QueueTransport,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One scripted transport reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: ProxyMethod,
    pub target: String,
    pub body: Option<Value>,
    pub at: Instant,
}

/// Mock queue transport: replies are consumed in call order, every call is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub replies: Arc<Mutex<VecDeque<Reply>>>,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
    pub submit_delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(self, replies: Vec<Reply>) -> Self {
        *self.replies.lock().unwrap() = replies.into();
        self
    }

    /// Holds every POST for `delay` before replying, like a slow submission.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn targets(&self) -> Vec<(ProxyMethod, String)> {
        self.get_calls()
            .into_iter()
            .map(|call| (call.method, call.target))
            .collect()
    }

    pub fn count_matching(&self, suffix: &str) -> usize {
        self.get_calls()
            .iter()
            .filter(|call| call.target.ends_with(suffix))
            .count()
    }
}

#[async_trait]
impl QueueTransport for MockTransport {
    async fn send(&self, request: ProxiedRequest) -> Result<Value> {
        let body = request
            .body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok());
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method,
            target: request.target.clone(),
            body,
            at: Instant::now(),
        });

        if let (ProxyMethod::Post, Some(delay)) = (request.method, self.submit_delay) {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Status(status)) => Err(Error::Upstream {
                status,
                body: "scripted failure".to_string(),
            }),
            None => Err(Error::Upstream {
                status: 500,
                body: "No more mock replies available".to_string(),
            }),
        }
    }
}

/// Mock LLM client for testing
#[derive(Debug, Default)]
pub struct MockLlmClient {
    pub response: Option<String>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLlmClient {
    pub fn returning(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.response
            .clone()
            .ok_or_else(|| Error::llm("mock LLM unavailable"))
    }
}
