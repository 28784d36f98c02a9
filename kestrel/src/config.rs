use std::time::Duration;

use serde::{Deserialize, Serialize};

use kestrel_api::errors::ConfigError;
use kestrel_api::priority::{ActivityPriority, LEVELS};
use kestrel_api::types::{duration_ms, duration_ms_opt};

pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;
pub const DEFAULT_PRIORITY_CAPACITY: usize = 256;
pub const DEFAULT_OFFER_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_EVENT_BUFFER: usize = 256;

// --- Mailbox Configuration ---

/// Configuration for one runtime instance's mailbox.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MailboxConfig {
    /// Capacity of the single FIFO queue used when prioritization is disabled.
    pub capacity: usize,

    /// Capacity of each per-level queue used when prioritization is enabled.
    pub priority_capacity: usize,

    /// Whether activities are split into one queue per priority level.
    pub enable_prioritization: bool,

    /// How long `offer` waits on a full queue when the activity sets no timeout.
    #[serde(with = "duration_ms")]
    pub default_timeout: Duration,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MAILBOX_CAPACITY,
            priority_capacity: DEFAULT_PRIORITY_CAPACITY,
            enable_prioritization: true,
            default_timeout: DEFAULT_OFFER_TIMEOUT,
        }
    }
}

impl MailboxConfig {
    /// Rejects configurations that would create a zero-sized queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enable_prioritization && self.priority_capacity == 0 {
            return Err(ConfigError::InvalidMailbox("priority_capacity must be positive".to_string()));
        }
        if !self.enable_prioritization && self.capacity == 0 {
            return Err(ConfigError::InvalidMailbox("capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Number of queues the mailbox allocates.
    pub fn lanes(&self) -> usize {
        if self.enable_prioritization {
            LEVELS
        } else {
            1
        }
    }

    /// Capacity of each allocated queue.
    pub fn lane_capacity(&self) -> usize {
        if self.enable_prioritization {
            self.priority_capacity
        } else {
            self.capacity
        }
    }
}

/// Per-instance mailbox settings that override the registry defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MailboxOverrides {
    pub capacity: Option<usize>,
    pub priority_capacity: Option<usize>,
    pub enable_prioritization: Option<bool>,
    #[serde(with = "duration_ms_opt")]
    pub default_timeout: Option<Duration>,
}

// --- Registry Configuration ---

/// Configuration for a `Registry`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Mailbox configuration applied to every instance unless overridden.
    pub default_mailbox: MailboxConfig,

    /// Number of runtime events buffered per instance for slow observers.
    pub event_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_mailbox: MailboxConfig::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl RegistryConfig {
    /// Parses a configuration from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.default_mailbox.validate()?;
        Ok(config)
    }

    /// Merge registry defaults with instance-specific overrides.
    /// This applies defaults from the registry config where the overrides don't specify values.
    pub fn merge_mailbox_config(&self, overrides: &MailboxOverrides) -> MailboxConfig {
        let defaults = &self.default_mailbox;
        MailboxConfig {
            capacity: overrides.capacity.unwrap_or(defaults.capacity),
            priority_capacity: overrides.priority_capacity.unwrap_or(defaults.priority_capacity),
            enable_prioritization: overrides.enable_prioritization.unwrap_or(defaults.enable_prioritization),
            default_timeout: overrides.default_timeout.unwrap_or(defaults.default_timeout),
        }
    }
}

// --- Supervisor Configuration ---

/// Configuration for the start commands a `Supervisor` sends to its tasks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupervisorConfig {
    /// Priority of start commands.
    pub start_priority: ActivityPriority,

    /// Delivery timeout of start commands, the mailbox default when absent.
    #[serde(with = "duration_ms_opt")]
    pub start_timeout: Option<Duration>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            start_priority: ActivityPriority::High,
            start_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_applies_defaults() {
        let registry = RegistryConfig::default();
        let merged = registry.merge_mailbox_config(&MailboxOverrides {
            priority_capacity: Some(1),
            ..Default::default()
        });

        assert_eq!(merged.priority_capacity, 1);
        assert_eq!(merged.capacity, DEFAULT_MAILBOX_CAPACITY);
        assert!(merged.enable_prioritization);
        assert_eq!(merged.default_timeout, DEFAULT_OFFER_TIMEOUT);
    }

    #[test]
    fn test_lane_layout() {
        let prioritized = MailboxConfig::default();
        assert_eq!(prioritized.lanes(), LEVELS);
        assert_eq!(prioritized.lane_capacity(), DEFAULT_PRIORITY_CAPACITY);

        let fifo = MailboxConfig { enable_prioritization: false, capacity: 8, ..Default::default() };
        assert_eq!(fifo.lanes(), 1);
        assert_eq!(fifo.lane_capacity(), 8);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = MailboxConfig { priority_capacity: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMailbox(_))));

        // the unused capacity does not matter
        let config = MailboxConfig { capacity: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = RegistryConfig::from_json(
            r#"{ "defaultMailbox": { "priorityCapacity": 4, "defaultTimeout": 50 }, "eventBuffer": 16 }"#,
        )
        .unwrap();

        assert_eq!(config.event_buffer, 16);
        assert_eq!(config.default_mailbox.priority_capacity, 4);
        assert_eq!(config.default_mailbox.default_timeout, Duration::from_millis(50));
        assert_eq!(config.default_mailbox.capacity, DEFAULT_MAILBOX_CAPACITY);

        assert!(matches!(RegistryConfig::from_json("{ not json"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            RegistryConfig::from_json(r#"{ "defaultMailbox": { "priorityCapacity": 0 } }"#),
            Err(ConfigError::InvalidMailbox(_))
        ));
    }
}
