//! Activity priority levels
//!
//! Kestrel mailboxes know exactly four levels. When prioritization is enabled
//! a mailbox keeps one bounded queue per level and always drains the most
//! urgent non-empty queue first.
//!
//! # Usage
//!
//! ```rust
//! use kestrel_api::priority::{ActivityPriority, LEVELS};
//!
//! assert_eq!(ActivityPriority::ALL.len(), LEVELS);
//! assert!(ActivityPriority::High > ActivityPriority::Background);
//! assert_eq!(ActivityPriority::default(), ActivityPriority::Normal);
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of priority levels.
pub const LEVELS: usize = 4;

/// Delivery priority of an activity.
///
/// Ordering follows urgency: `High` compares greater than `Normal`, and so on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityPriority {
    /// Time-sensitive activities, drained first
    High,
    /// Standard priority
    #[default]
    Normal,
    /// Deferred work
    Low,
    /// Bulk or housekeeping work, drained last
    Background,
}

impl ActivityPriority {
    /// All levels in delivery order.
    pub const ALL: [ActivityPriority; LEVELS] = [
        ActivityPriority::High,
        ActivityPriority::Normal,
        ActivityPriority::Low,
        ActivityPriority::Background,
    ];

    /// Position of this level in delivery order, `0` being drained first.
    pub fn index(self) -> usize {
        match self {
            ActivityPriority::High => 0,
            ActivityPriority::Normal => 1,
            ActivityPriority::Low => 2,
            ActivityPriority::Background => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityPriority::High => "HIGH",
            ActivityPriority::Normal => "NORMAL",
            ActivityPriority::Low => "LOW",
            ActivityPriority::Background => "BACKGROUND",
        }
    }
}

impl PartialOrd for ActivityPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ActivityPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        other.index().cmp(&self.index())
    }
}

impl fmt::Display for ActivityPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
