// Kestrel Agent Runtime
//
// Tokio-based implementation of the Kestrel API: flume-backed priority
// mailboxes, one consumption task per runtime instance, the registry that owns
// those instances, and the two-stage process supervisor.

pub mod config;
pub mod logging;
pub mod mailbox;
pub mod runtime;
pub mod supervisor;

// Re-export commonly used types
pub use config::{MailboxConfig, MailboxOverrides, RegistryConfig, SupervisorConfig};
pub use mailbox::PriorityMailbox;
pub use runtime::{Observation, Registry, RuntimeSubscription};
pub use supervisor::Supervisor;
