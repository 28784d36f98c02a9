//! # Runtime State Snapshots
//!
//! The values callers read back from a running instance and from its mailbox.
//! Snapshots are copies: the consumption loop is the only writer of the live
//! state cell.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::WorkflowError;
use crate::types::{now_millis, RuntimeId};

/// Processing status of a runtime instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeStatus {
    /// Waiting for the next activity
    Idle,
    /// A workflow call is in flight
    Processing,
    /// The most recent activity failed
    Error,
}

/// Processing counters of a runtime instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    /// Activities the workflow completed successfully
    pub processed: u64,
    /// Activities the workflow failed on
    pub failures: u64,
    /// Mean workflow time in milliseconds over every attempt
    pub avg_processing_time: f64,
}

impl ProcessingStats {
    /// Folds one workflow attempt into the counters.
    pub fn record(&mut self, elapsed: Duration, succeeded: bool) {
        let attempts = self.processed + self.failures;
        self.avg_processing_time = running_mean(self.avg_processing_time, attempts, elapsed);
        if succeeded {
            self.processed += 1;
        } else {
            self.failures += 1;
        }
    }
}

/// Snapshot of one runtime instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState<S> {
    pub id: RuntimeId,
    /// Caller-defined state payload
    pub state: S,
    pub status: RuntimeStatus,
    /// Milliseconds since the UNIX epoch
    pub last_updated: u64,
    pub processing: ProcessingStats,
    /// Present only while `status` is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WorkflowError>,
}

impl<S> RuntimeState<S> {
    /// Initial snapshot of a freshly created instance.
    pub fn new(id: impl Into<RuntimeId>, state: S) -> Self {
        Self {
            id: id.into(),
            state,
            status: RuntimeStatus::Idle,
            last_updated: now_millis(),
            processing: ProcessingStats::default(),
            error: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == RuntimeStatus::Idle
    }

    pub fn is_error(&self) -> bool {
        self.status == RuntimeStatus::Error
    }
}

/// Mailbox counters aggregated across priority levels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxStats {
    /// Activities currently queued
    pub size: usize,
    /// Activities reported processed by the consumer
    pub processed: u64,
    /// Offers that gave up on a full queue
    pub timeouts: u64,
    /// Mean processing time in milliseconds
    pub avg_processing_time: f64,
}

/// Incremental mean in milliseconds after adding `sample` to `count` prior samples.
pub fn running_mean(mean: f64, count: u64, sample: Duration) -> f64 {
    let sample_ms = sample.as_secs_f64() * 1000.0;
    mean + (sample_ms - mean) / (count as f64 + 1.0)
}
