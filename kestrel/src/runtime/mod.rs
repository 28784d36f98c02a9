//! Runtime instances and the registry that owns them.

mod instance;
pub mod registry;

pub use registry::{Observation, Registry, RuntimeSubscription};
