use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

#[derive(Debug)]
struct SlotEntry {
    ticket: Uuid,
    token: CancellationToken,
}

/// One in-flight job per workflow. Starting a job in an occupied slot cancels the previous one.
#[derive(Debug, Clone, Default)]
pub struct JobSlots {
    inner: Arc<Mutex<HashMap<String, SlotEntry>>>,
}

impl JobSlots {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SlotEntry>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claims the slot for a new job, cancelling whatever occupied it.
    pub fn begin(&self, workflow: &str) -> SlotGuard {
        let ticket = Uuid::new_v4();
        let token = CancellationToken::new();

        let previous = self.lock().insert(
            workflow.to_string(),
            SlotEntry {
                ticket,
                token: token.clone(),
            },
        );

        if let Some(previous) = previous {
            info!(workflow, "Replacing in-flight job {}", previous.ticket);
            previous.token.cancel();
        }

        SlotGuard {
            slots: self.clone(),
            workflow: workflow.to_string(),
            ticket,
            token,
        }
    }

    /// Cancels the job in the slot, if any. Returns whether one was running.
    pub fn cancel(&self, workflow: &str) -> bool {
        match self.lock().remove(workflow) {
            Some(entry) => {
                info!(workflow, "Cancelling in-flight job {}", entry.ticket);
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, workflow: &str) -> bool {
        self.lock().contains_key(workflow)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}

/// Occupancy of a slot. Releases the slot on drop unless a newer job has taken it.
#[derive(Debug)]
pub struct SlotGuard {
    slots: JobSlots,
    workflow: String,
    ticket: Uuid,
    token: CancellationToken,
}

impl SlotGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn ticket(&self) -> Uuid {
        self.ticket
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        if slots
            .get(&self.workflow)
            .is_some_and(|entry| entry.ticket == self.ticket)
        {
            slots.remove(&self.workflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_cancels_previous_in_same_slot() {
        let slots = JobSlots::new();
        let first = slots.begin("tweak-it");
        let second = slots.begin("tweak-it");

        assert!(first.token().is_cancelled());
        assert!(!second.token().is_cancelled());
        assert_eq!(slots.active_count(), 1);
    }

    #[test]
    fn test_slots_are_independent_per_workflow() {
        let slots = JobSlots::new();
        let image = slots.begin("prompt-image");
        let video = slots.begin("video-it");

        assert!(!image.token().is_cancelled());
        assert!(!video.token().is_cancelled());
        assert_eq!(slots.active_count(), 2);
    }

    #[test]
    fn test_stale_guard_does_not_release_newer_job() {
        let slots = JobSlots::new();
        let first = slots.begin("stylize-it");
        let second = slots.begin("stylize-it");

        drop(first);
        assert!(slots.is_active("stylize-it"));

        drop(second);
        assert!(!slots.is_active("stylize-it"));
    }

    #[test]
    fn test_cancel_reports_whether_a_job_was_running() {
        let slots = JobSlots::new();
        assert!(!slots.cancel("video-it"));

        let guard = slots.begin("video-it");
        assert!(slots.cancel("video-it"));
        assert!(guard.token().is_cancelled());
        assert!(!slots.is_active("video-it"));
    }
}
