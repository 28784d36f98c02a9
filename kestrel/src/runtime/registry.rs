//! # Runtime Registry
//!
//! `Registry` is the lookup table of live runtime instances and the only
//! surface upstream callers use: `create`, `terminate`, `send`, `get_state`
//! and `subscribe`.
//!
//! ## Key Concepts
//! - One entry per id; re-creation is allowed only after `terminate`
//! - Each entry owns exactly one consumption loop
//! - The id → entry map is the only state shared between instances and is
//!   guarded by a single lock; `create` checks for duplicates and inserts
//!   under one write guard
//! - Workflow failures never surface from `send`; callers observe them
//!   through `get_state` or `subscribe`

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::stream::{self, BoxStream, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use kestrel_api::activity::Activity;
use kestrel_api::errors::RegistryError;
use kestrel_api::event::RuntimeEvent;
use kestrel_api::mailbox::Mailbox;
use kestrel_api::state::{MailboxStats, RuntimeState};
use kestrel_api::types::RuntimeId;
use kestrel_api::workflow::{BoxedWorkflow, Workflow};

use crate::config::{MailboxOverrides, RegistryConfig};
use crate::mailbox::PriorityMailbox;
use crate::runtime::instance::RuntimeInstance;

/// Registry of live runtime instances sharing one state type `S`.
pub struct Registry<S> {
    config: RegistryConfig,
    instances: RwLock<HashMap<RuntimeId, RuntimeInstance<S>>>,
    /// Runtime the consumption loops are spawned on
    runtime_handle: Handle,
}

impl<S> fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("instance_count", &self.read().len())
            .finish()
    }
}

impl<S> Registry<S> {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<RuntimeId, RuntimeInstance<S>>> {
        self.instances.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RuntimeId, RuntimeInstance<S>>> {
        self.instances.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Ids of every registered instance, sorted.
    pub fn ids(&self) -> Vec<RuntimeId> {
        let mut ids: Vec<_> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Counters of an instance's mailbox.
    pub fn mailbox_stats(&self, id: &str) -> Result<MailboxStats, RegistryError> {
        self.read()
            .get(id)
            .map(|instance| instance.mailbox().stats())
            .ok_or_else(|| RegistryError::RuntimeNotFound(id.to_string()))
    }

    /// Whether the instance's consumption loop is still running.
    pub fn is_running(&self, id: &str) -> Result<bool, RegistryError> {
        self.read()
            .get(id)
            .map(RuntimeInstance::is_running)
            .ok_or_else(|| RegistryError::RuntimeNotFound(id.to_string()))
    }

    /// Cancels an instance's loop, shuts its mailbox down and removes it.
    ///
    /// An activity being processed at that moment may not complete.
    pub fn terminate(&self, id: &str) -> Result<(), RegistryError> {
        let instance = self
            .write()
            .remove(id)
            .ok_or_else(|| RegistryError::RuntimeNotFound(id.to_string()))?;

        // Dropping aborts the loop and shuts the mailbox down.
        drop(instance);
        crate::log_lifecycle!(id, "terminated");
        Ok(())
    }

    /// Terminates every instance.
    pub fn shutdown(&self) {
        let instances: Vec<_> = self.write().drain().collect();
        let count = instances.len();
        drop(instances);
        debug!(terminated = count, "registry shut down");
    }
}

impl<S> Registry<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates a registry spawning its loops on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside of a tokio runtime.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_handle(config, Handle::current())
    }

    /// Creates a registry spawning its loops on `runtime_handle`.
    pub fn with_handle(config: RegistryConfig, runtime_handle: Handle) -> Self {
        Self {
            config,
            instances: RwLock::new(HashMap::new()),
            runtime_handle,
        }
    }

    /// Registers a new instance with the default mailbox configuration and starts its loop.
    pub fn create<W>(&self, id: impl Into<RuntimeId>, initial_state: S, workflow: W) -> Result<(), RegistryError>
    where
        W: Workflow<S>,
    {
        self.create_with_config(id, initial_state, workflow, &MailboxOverrides::default())
    }

    /// Registers a new instance whose mailbox merges `overrides` over the registry default.
    pub fn create_with_config<W>(
        &self,
        id: impl Into<RuntimeId>,
        initial_state: S,
        workflow: W,
        overrides: &MailboxOverrides,
    ) -> Result<(), RegistryError>
    where
        W: Workflow<S>,
    {
        let id = id.into();
        let mailbox_config = self.config.merge_mailbox_config(overrides);
        mailbox_config.validate()?;

        let workflow: BoxedWorkflow<S> = Arc::new(workflow);
        let prioritized = mailbox_config.enable_prioritization;

        let mut instances = self.write();
        if instances.contains_key(&id) {
            return Err(RegistryError::DuplicateRuntime(id));
        }

        let mailbox = PriorityMailbox::new(id.clone(), mailbox_config);
        let instance = RuntimeInstance::spawn(
            id.clone(),
            initial_state,
            workflow,
            mailbox,
            self.config.event_buffer,
            &self.runtime_handle,
        );
        instances.insert(id.clone(), instance);
        drop(instances);

        crate::log_lifecycle!(id, "created", prioritized = prioritized);
        Ok(())
    }

    /// Delivers an activity to an instance's mailbox.
    ///
    /// Waits while the target queue is full, up to the activity's timeout.
    /// Only delivery is reported here; the workflow's outcome is not.
    pub async fn send(&self, id: &str, activity: Activity) -> Result<(), RegistryError> {
        let mailbox = self
            .read()
            .get(id)
            .map(|instance| instance.mailbox().clone())
            .ok_or_else(|| RegistryError::RuntimeNotFound(id.to_string()))?;

        crate::log_activity!(activity.kind, "sent", runtime_id = %id, activity_id = %activity.id);
        mailbox.offer(activity).await?;
        Ok(())
    }

    /// Current snapshot of an instance.
    pub fn get_state(&self, id: &str) -> Result<RuntimeState<S>, RegistryError> {
        self.read()
            .get(id)
            .map(RuntimeInstance::snapshot)
            .ok_or_else(|| RegistryError::RuntimeNotFound(id.to_string()))
    }

    /// Observes an instance's activity processing.
    ///
    /// Every subscriber gets its own copy of each event, so observers never
    /// take work away from the instance.
    pub fn subscribe(&self, id: &str) -> Result<RuntimeSubscription<S>, RegistryError> {
        self.read()
            .get(id)
            .map(|instance| RuntimeSubscription {
                runtime_id: id.to_string(),
                receiver: instance.subscribe(),
            })
            .ok_or_else(|| RegistryError::RuntimeNotFound(id.to_string()))
    }
}

impl<S> Drop for Registry<S> {
    fn drop(&mut self) {
        // Dropping the entries aborts their loops.
        self.write().clear();
    }
}

/// One step of a subscription.
#[derive(Clone, Debug)]
pub enum Observation<S> {
    Event(RuntimeEvent<S>),
    /// This many events were dropped before the subscriber read them.
    Lagged(u64),
}

/// An observer's view of one runtime instance.
pub struct RuntimeSubscription<S> {
    runtime_id: RuntimeId,
    receiver: broadcast::Receiver<RuntimeEvent<S>>,
}

impl<S> fmt::Debug for RuntimeSubscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeSubscription")
            .field("runtime_id", &self.runtime_id)
            .finish()
    }
}

impl<S> RuntimeSubscription<S>
where
    S: Clone + Send + 'static,
{
    pub fn runtime_id(&self) -> &str {
        &self.runtime_id
    }

    /// Next event or the number of events this subscriber fell behind by,
    /// `None` once the instance is gone.
    pub async fn observe(&mut self) -> Option<Observation<S>> {
        match self.receiver.recv().await {
            Ok(event) => Some(Observation::Event(event)),
            Err(RecvError::Lagged(skipped)) => Some(Observation::Lagged(skipped)),
            Err(RecvError::Closed) => None,
        }
    }

    /// Next event, or `None` once the instance is gone.
    ///
    /// A subscriber that falls more than the registry's event buffer behind
    /// skips the events it missed. Use `observe` to notice the gap.
    pub async fn recv(&mut self) -> Option<RuntimeEvent<S>> {
        loop {
            match self.observe().await? {
                Observation::Event(event) => return Some(event),
                Observation::Lagged(skipped) => {
                    warn!(runtime_id = %self.runtime_id, skipped, "runtime subscriber lagged");
                }
            }
        }
    }

    /// Discards every event published so far; the next event received is the
    /// next one the instance publishes.
    pub fn skip_backlog(&mut self) {
        self.receiver = self.receiver.resubscribe();
    }

    pub fn into_stream(self) -> BoxStream<'static, RuntimeEvent<S>> {
        stream::unfold(self, |mut subscription| async move {
            subscription.recv().await.map(|event| (event, subscription))
        })
        .boxed()
    }
}
