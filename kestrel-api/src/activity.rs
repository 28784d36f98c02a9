//! # Activities
//!
//! An activity is the unit of work delivered to a runtime instance. It carries
//! an opaque JSON payload that only the instance's workflow interprets, plus
//! delivery metadata the mailbox acts on.
//!
//! ## Usage Example
//!
//! ```rust
//! use kestrel_api::activity::{Activity, ActivityKind};
//! use kestrel_api::priority::ActivityPriority;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let activity = Activity::new("agent-7", ActivityKind::Event, json!({ "tag": "draft" }))
//!     .with_priority(ActivityPriority::Low)
//!     .with_timeout(Duration::from_millis(250))
//!     .with_correlation_id("process-42");
//!
//! assert_eq!(activity.runtime_id, "agent-7");
//! assert_eq!(activity.correlation_id(), Some("process-42"));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::priority::ActivityPriority;
use crate::types::{now_millis, ActivityId, RuntimeId};

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Kind of an activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    /// Instruction for the instance to do something
    Command,
    /// Notification that something happened elsewhere
    Event,
    /// Notification that some observed state changed
    StateChange,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityKind::Command => "COMMAND",
            ActivityKind::Event => "EVENT",
            ActivityKind::StateChange => "STATE_CHANGE",
        };
        f.write_str(name)
    }
}

/// Delivery metadata attached to an activity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMetadata {
    /// Delivery priority, `NORMAL` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<ActivityPriority>,

    /// Maximum time `offer` may wait on a full queue
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::types::duration_ms_opt")]
    pub timeout: Option<Duration>,

    /// Threads related activities together, used by the supervisor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Unit of work delivered to a runtime instance's mailbox.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique identifier of this activity
    pub id: ActivityId,

    /// Target instance
    pub runtime_id: RuntimeId,

    /// Command, event or state change
    #[serde(rename = "type")]
    pub kind: ActivityKind,

    /// Opaque content, interpreted only by the workflow
    pub payload: Value,

    /// Creation time in milliseconds since the UNIX epoch
    pub timestamp: u64,

    /// Process-wide monotonic creation order
    pub sequence: u64,

    #[serde(default)]
    pub metadata: ActivityMetadata,
}

impl Activity {
    /// Creates an activity with a fresh id, the current timestamp and the next sequence number.
    pub fn new(runtime_id: impl Into<RuntimeId>, kind: ActivityKind, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            runtime_id: runtime_id.into(),
            kind,
            payload,
            timestamp: now_millis(),
            sequence: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            metadata: ActivityMetadata::default(),
        }
    }

    pub fn command(runtime_id: impl Into<RuntimeId>, payload: Value) -> Self {
        Self::new(runtime_id, ActivityKind::Command, payload)
    }

    pub fn event(runtime_id: impl Into<RuntimeId>, payload: Value) -> Self {
        Self::new(runtime_id, ActivityKind::Event, payload)
    }

    pub fn state_change(runtime_id: impl Into<RuntimeId>, payload: Value) -> Self {
        Self::new(runtime_id, ActivityKind::StateChange, payload)
    }

    /// Replaces the generated id.
    pub fn with_id(mut self, id: impl Into<ActivityId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: ActivityPriority) -> Self {
        self.metadata.priority = Some(priority);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.metadata.timeout = Some(timeout);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(correlation_id.into());
        self
    }

    /// Effective priority, `NORMAL` when none was set.
    pub fn priority(&self) -> ActivityPriority {
        self.metadata.priority.unwrap_or_default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.metadata.timeout
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.metadata.correlation_id.as_deref()
    }
}
