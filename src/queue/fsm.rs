use super::types::JobStatus;
use crate::{Error, Result};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitting,
    Queued,
    Running,
    /// Upstream reports completion but the result has not been fetched yet.
    Resolving,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    Enqueued,
    Started,
    Finished,
    ResultReady,
    Errored,
    AttemptsExhausted,
    CancelRequested,
}

impl JobEvent {
    pub fn from_status(status: &JobStatus) -> Self {
        match status {
            JobStatus::Queued(_) => Self::Enqueued,
            JobStatus::Running => Self::Started,
            JobStatus::Completed(_) => Self::Finished,
            JobStatus::Failed(_) => Self::Errored,
        }
    }
}

/// Lifecycle of one submitted job.
#[derive(Debug)]
pub struct JobStateMachine {
    request_id: String,
    state: JobState,
}

impl JobStateMachine {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            state: JobState::Submitting,
        }
    }

    pub fn current_state(&self) -> JobState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn transition(&mut self, event: JobEvent) -> Result<JobState> {
        let old_state = self.state;

        let new_state = match (old_state, event) {
            (state, _) if state.is_terminal() => None,
            (_, JobEvent::Enqueued) => Some(JobState::Queued),
            (_, JobEvent::Started) => Some(JobState::Running),
            (_, JobEvent::Finished) => Some(JobState::Resolving),
            (JobState::Resolving, JobEvent::ResultReady) => Some(JobState::Completed),
            (_, JobEvent::Errored) => Some(JobState::Failed),
            (JobState::Submitting, JobEvent::AttemptsExhausted) => None,
            (_, JobEvent::AttemptsExhausted) => Some(JobState::TimedOut),
            (_, JobEvent::CancelRequested) => Some(JobState::Cancelled),
            _ => None,
        };

        let Some(new_state) = new_state else {
            warn!(
                request_id = %self.request_id,
                "Invalid job transition from {:?} with event {:?}", old_state, event
            );
            return Err(Error::InvalidTransition {
                current: format!("{old_state:?}"),
                requested: format!("{event:?}"),
            });
        };

        if old_state != new_state {
            info!(
                request_id = %self.request_id,
                "Job state transition: {:?} -> {:?} (event: {:?})", old_state, new_state, event
            );
        } else {
            debug!(
                request_id = %self.request_id,
                "Job staying in state {:?} after event {:?}", old_state, event
            );
        }

        self.state = new_state;
        Ok(new_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_happy_path() {
        let mut machine = JobStateMachine::new("req");
        assert_eq!(machine.current_state(), JobState::Submitting);

        machine.transition(JobEvent::Enqueued).unwrap();
        machine.transition(JobEvent::Enqueued).unwrap();
        machine.transition(JobEvent::Started).unwrap();
        machine.transition(JobEvent::Finished).unwrap();
        assert_eq!(machine.current_state(), JobState::Resolving);

        machine.transition(JobEvent::ResultReady).unwrap();
        assert_eq!(machine.current_state(), JobState::Completed);
        assert!(machine.is_terminal());
    }

    #[test]
    fn test_first_observation_may_already_be_complete() {
        let mut machine = JobStateMachine::new("req");
        let state = machine
            .transition(JobEvent::from_status(&JobStatus::Completed(None)))
            .unwrap();
        assert_eq!(state, JobState::Resolving);
    }

    #[test]
    fn test_result_requires_completion() {
        let mut machine = JobStateMachine::new("req");
        machine.transition(JobEvent::Started).unwrap();

        let err = machine.transition(JobEvent::ResultReady).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        let mut machine = JobStateMachine::new("req");
        machine.transition(JobEvent::Enqueued).unwrap();
        machine.transition(JobEvent::AttemptsExhausted).unwrap();
        assert_eq!(machine.current_state(), JobState::TimedOut);

        assert!(machine.transition(JobEvent::Started).is_err());
        assert!(machine.transition(JobEvent::CancelRequested).is_err());
    }

    #[test]
    fn test_cannot_time_out_before_submission_resolves() {
        let mut machine = JobStateMachine::new("req");
        assert!(machine.transition(JobEvent::AttemptsExhausted).is_err());
    }
}
