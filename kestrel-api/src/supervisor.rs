//! # Two-Stage Process Supervision
//!
//! A supervised process runs Task A, then Task B, and fails as soon as either
//! stage fails. This module holds the pure state machine; the runtime crate
//! drives it against live instances.
//!
//! ```text
//! idle --START_PROCESS--> taskA running --TASK_A_COMPLETED--> taskB running --TASK_B_COMPLETED--> completed
//!                               |                                   |
//!                               +--TASK_A_FAILED--> failed <--TASK_B_FAILED--+
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::SupervisorError;

/// State of a supervised process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessState {
    Idle,
    TaskARunning,
    TaskBRunning,
    /// Both stages succeeded (terminal)
    Completed,
    /// A stage failed (terminal)
    Failed,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Completed | ProcessState::Failed)
    }

    /// Target state for `event`, or `InvalidTransition` if the event is not
    /// accepted here. Terminal states accept nothing.
    pub fn next(self, event: &SupervisorEvent) -> Result<ProcessState, SupervisorError> {
        use ProcessState::*;
        use SupervisorEvent::*;

        match (self, event) {
            (Idle, StartProcess) => Ok(TaskARunning),
            (TaskARunning, TaskACompleted) => Ok(TaskBRunning),
            (TaskARunning, TaskAFailed { .. }) => Ok(Failed),
            (TaskBRunning, TaskBCompleted) => Ok(Completed),
            (TaskBRunning, TaskBFailed { .. }) => Ok(Failed),
            (state, event) => Err(SupervisorError::InvalidTransition {
                state,
                event: event.name(),
            }),
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Idle => "idle",
            ProcessState::TaskARunning => "taskA running",
            ProcessState::TaskBRunning => "taskB running",
            ProcessState::Completed => "completed",
            ProcessState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Input to the process state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupervisorEvent {
    StartProcess,
    TaskACompleted,
    TaskAFailed { error: String },
    TaskBCompleted,
    TaskBFailed { error: String },
}

impl SupervisorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SupervisorEvent::StartProcess => "START_PROCESS",
            SupervisorEvent::TaskACompleted => "TASK_A_COMPLETED",
            SupervisorEvent::TaskAFailed { .. } => "TASK_A_FAILED",
            SupervisorEvent::TaskBCompleted => "TASK_B_COMPLETED",
            SupervisorEvent::TaskBFailed { .. } => "TASK_B_FAILED",
        }
    }

    /// Error carried by a failure event.
    pub fn error(&self) -> Option<&str> {
        match self {
            SupervisorEvent::TaskAFailed { error } | SupervisorEvent::TaskBFailed { error } => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for SupervisorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the two supervised stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    TaskA,
    TaskB,
}

impl Stage {
    pub fn completed(self) -> SupervisorEvent {
        match self {
            Stage::TaskA => SupervisorEvent::TaskACompleted,
            Stage::TaskB => SupervisorEvent::TaskBCompleted,
        }
    }

    pub fn failed(self, error: impl Into<String>) -> SupervisorEvent {
        match self {
            Stage::TaskA => SupervisorEvent::TaskAFailed { error: error.into() },
            Stage::TaskB => SupervisorEvent::TaskBFailed { error: error.into() },
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::TaskA => f.write_str("taskA"),
            Stage::TaskB => f.write_str("taskB"),
        }
    }
}

/// Readable record of a supervised process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSnapshot {
    #[serde(rename = "processState")]
    pub state: ProcessState,
    pub correlation_id: String,
    /// Milliseconds since the UNIX epoch
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub error: Option<String>,
}

impl ProcessSnapshot {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            state: ProcessState::Idle,
            correlation_id: correlation_id.into(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = ProcessState::Idle;
        let state = state.next(&SupervisorEvent::StartProcess).unwrap();
        assert_eq!(state, ProcessState::TaskARunning);
        let state = state.next(&SupervisorEvent::TaskACompleted).unwrap();
        assert_eq!(state, ProcessState::TaskBRunning);
        let state = state.next(&SupervisorEvent::TaskBCompleted).unwrap();
        assert_eq!(state, ProcessState::Completed);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_failure_from_either_stage() {
        let failed_a = ProcessState::TaskARunning
            .next(&Stage::TaskA.failed("boom"))
            .unwrap();
        assert_eq!(failed_a, ProcessState::Failed);

        let failed_b = ProcessState::TaskBRunning
            .next(&Stage::TaskB.failed("boom"))
            .unwrap();
        assert_eq!(failed_b, ProcessState::Failed);
    }

    #[test]
    fn test_rejects_out_of_order_events() {
        let err = ProcessState::Idle
            .next(&SupervisorEvent::TaskBCompleted)
            .unwrap_err();
        assert_eq!(
            err,
            SupervisorError::InvalidTransition {
                state: ProcessState::Idle,
                event: "TASK_B_COMPLETED",
            }
        );

        // task B events are not accepted while task A runs
        assert!(ProcessState::TaskARunning.next(&SupervisorEvent::TaskBCompleted).is_err());
        assert!(ProcessState::TaskBRunning.next(&SupervisorEvent::StartProcess).is_err());
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for state in [ProcessState::Completed, ProcessState::Failed] {
            assert!(state.next(&SupervisorEvent::StartProcess).is_err());
            assert!(state.next(&SupervisorEvent::TaskACompleted).is_err());
            assert!(state.next(&Stage::TaskB.failed("late")).is_err());
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ProcessState::TaskARunning.to_string(), "taskA running");
        assert_eq!(Stage::TaskB.failed("x").to_string(), "TASK_B_FAILED");
        assert_eq!(Stage::TaskA.failed("x").error(), Some("x"));
    }
}
