//! Mailbox implementations.
//!
//! `PriorityMailbox` is the mailbox every registry instance gets. It
//! implements [`kestrel_api::Mailbox`], so the consumption loop never depends
//! on its internals.

pub mod priority;

pub use kestrel_api::mailbox::{subscribe, Mailbox};
pub use priority::PriorityMailbox;
