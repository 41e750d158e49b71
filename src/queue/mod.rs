//! Client for the upstream's queue-based generation API: submit, poll, resolve.

mod client;
mod fsm;
mod kind;
mod slots;
mod transport;
mod types;

pub use client::JobClient;
pub use fsm::{JobEvent, JobState, JobStateMachine};
pub use kind::{JobKind, JobProfile};
pub use slots::{JobSlots, SlotGuard};
pub use transport::{ProxyTransport, QueueTransport, ShieldedTransport};
pub use types::{
    Asset, GenerationResult, JobHandle, JobStatus, QueueResponse, STATUS_COMPLETED,
    STATUS_IN_PROGRESS, STATUS_IN_QUEUE,
};
