//! # Kestrel Agent Runtime API
//!
//! Kestrel runs independent, stateful agent instances. Each instance owns
//! private state and consumes activities (commands, events, state-change
//! notifications) from a bounded, priority-ordered mailbox. This crate holds
//! the contracts shared by every implementation of the runtime.
//!
//! ## Core Components
//!
//! - **Activities**: The unit of work delivered to an instance
//! - **Priorities**: Four fixed delivery levels, HIGH through BACKGROUND
//! - **State**: The snapshot callers read back from an instance
//! - **Mailbox**: Bounded inbox abstraction with backpressure
//! - **Workflow**: Caller-supplied business logic run once per activity
//! - **Supervision**: Two-stage process state machine
//!
//! ## Usage Example
//!
//! ```rust
//! use kestrel_api::{Activity, ActivityPriority, FnWorkflow};
//! use serde_json::json;
//!
//! let workflow = FnWorkflow::new(|_activity: &Activity, count: &u64| Ok(count + 1));
//!
//! let activity = Activity::command("counter-1", json!({ "op": "increment" }))
//!     .with_priority(ActivityPriority::High);
//! assert_eq!(activity.priority(), ActivityPriority::High);
//! # let _ = workflow;
//! ```
//!
//! ## Module Organization
//!
//! - [`activity`]: Activity model and builder
//! - [`priority`]: Priority levels
//! - [`state`]: Runtime snapshots and mailbox statistics
//! - [`mailbox`]: Mailbox trait and activity stream
//! - [`workflow`]: Workflow strategy trait
//! - [`event`]: Events published to observers of an instance
//! - [`supervisor`]: Process state machine types
//! - [`errors`]: Error taxonomy
//! - [`types`]: Common type definitions

pub mod activity;
pub mod errors;
pub mod event;
pub mod mailbox;
pub mod priority;
pub mod state;
pub mod supervisor;
pub mod types;
pub mod workflow;

pub use activity::{Activity, ActivityKind, ActivityMetadata};
pub use errors::{ConfigError, MailboxError, RegistryError, SupervisorError, WorkflowError};
pub use event::RuntimeEvent;
pub use mailbox::Mailbox;
pub use priority::ActivityPriority;
pub use state::{MailboxStats, ProcessingStats, RuntimeState, RuntimeStatus};
pub use supervisor::{ProcessSnapshot, ProcessState, Stage, SupervisorEvent};
pub use types::{ActivityId, RuntimeId};
pub use workflow::{BoxedWorkflow, FnWorkflow, Workflow};
