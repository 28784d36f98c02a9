//! # Runtime Error Types
//!
//! Error taxonomy shared by every Kestrel component.
//!
//! ## Propagation
//!
//! - Registration and lookup errors (`RegistryError`) are returned directly
//!   to the caller.
//! - Delivery errors (`MailboxError`) are returned from `send` and `offer`.
//! - Workflow failures (`WorkflowError`) are never returned to the sender.
//!   They are recorded into the instance's `RuntimeState::error` and the
//!   instance keeps consuming.
//!
//! ## Usage Example
//!
//! ```rust
//! use kestrel_api::errors::RegistryError;
//!
//! fn describe(error: &RegistryError) -> &'static str {
//!     match error {
//!         RegistryError::DuplicateRuntime(_) => "pick another id",
//!         RegistryError::RuntimeNotFound(_) => "create the instance first",
//!         _ => "delivery problem",
//!     }
//! }
//! # let _ = describe;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::supervisor::ProcessState;
use crate::types::{ActivityId, RuntimeId};

/// Errors raised by mailbox operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailboxError {
    /// The target queue stayed full for the whole offer timeout.
    #[error("Mailbox offer timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The mailbox was shut down.
    #[error("Mailbox is shut down")]
    Shutdown,

    /// Non-blocking offer found the target queue full.
    #[error("Mailbox is full (capacity: {capacity})")]
    Full { capacity: usize },
}

/// Failure of a workflow on one activity.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum WorkflowError {
    /// The workflow returned an error.
    #[error("Workflow failed on activity {activity_id}: {message}")]
    Execution { activity_id: ActivityId, message: String },

    /// The workflow panicked.
    #[error("Workflow panicked on activity {activity_id}: {message}")]
    Panicked { activity_id: ActivityId, message: String },
}

impl WorkflowError {
    /// Wraps an error returned by a workflow, keeping its context chain.
    pub fn execution(activity_id: impl Into<ActivityId>, error: &anyhow::Error) -> Self {
        WorkflowError::Execution {
            activity_id: activity_id.into(),
            message: format!("{error:#}"),
        }
    }

    pub fn panicked(activity_id: impl Into<ActivityId>, message: impl Into<String>) -> Self {
        WorkflowError::Panicked {
            activity_id: activity_id.into(),
            message: message.into(),
        }
    }

    pub fn activity_id(&self) -> &str {
        match self {
            WorkflowError::Execution { activity_id, .. } | WorkflowError::Panicked { activity_id, .. } => activity_id,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            WorkflowError::Execution { message, .. } | WorkflowError::Panicked { message, .. } => message,
        }
    }
}

/// Invalid runtime configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid mailbox configuration: {0}")]
    InvalidMailbox(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Errors raised by registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// `create` was called with an id that is already registered.
    #[error("Runtime already exists: {0}")]
    DuplicateRuntime(RuntimeId),

    /// The id is not registered.
    #[error("Runtime not found: {0}")]
    RuntimeNotFound(RuntimeId),

    /// Delivery to the instance's mailbox failed.
    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by the supervisor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    /// The event is not accepted in the current process state.
    #[error("Invalid transition: {event} in state '{state}'")]
    InvalidTransition { state: ProcessState, event: &'static str },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}
