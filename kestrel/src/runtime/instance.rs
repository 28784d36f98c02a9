//! # Runtime Instance
//!
//! One runtime instance is a state cell plus a single tokio task draining the
//! instance's mailbox. The task is the only writer of the state cell; every
//! other access takes a snapshot.
//!
//! ## Consumption Loop
//! 1. Take the next activity (suspends while the mailbox is empty)
//! 2. Mark the instance `PROCESSING`
//! 3. Run the workflow on a copy of the current state
//! 4. On success store the new state and go back to `IDLE`
//! 5. On failure (returned error or panic) record the error, mark `ERROR`
//!    and keep consuming
//!
//! The loop ends when the mailbox shuts down or the task is aborted.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn, Instrument};

use kestrel_api::activity::Activity;
use kestrel_api::errors::{MailboxError, WorkflowError};
use kestrel_api::event::RuntimeEvent;
use kestrel_api::mailbox::Mailbox;
use kestrel_api::state::{RuntimeState, RuntimeStatus};
use kestrel_api::types::{now_millis, RuntimeId};
use kestrel_api::workflow::BoxedWorkflow;

use crate::mailbox::PriorityMailbox;

type StateCell<S> = Arc<RwLock<RuntimeState<S>>>;

/// A live runtime instance: its state cell, mailbox, observer channel and loop task.
///
/// Dropping the instance aborts the loop and shuts the mailbox down.
pub(crate) struct RuntimeInstance<S> {
    id: RuntimeId,
    state: StateCell<S>,
    mailbox: Arc<PriorityMailbox>,
    events: broadcast::Sender<RuntimeEvent<S>>,
    handle: JoinHandle<()>,
}

impl<S> RuntimeInstance<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Starts the consumption loop for a new instance on `runtime`.
    pub(crate) fn spawn(
        id: RuntimeId,
        initial_state: S,
        workflow: BoxedWorkflow<S>,
        mailbox: PriorityMailbox,
        event_buffer: usize,
        runtime: &Handle,
    ) -> Self {
        let state = Arc::new(RwLock::new(RuntimeState::new(id.clone(), initial_state)));
        let mailbox = Arc::new(mailbox);
        let (events, _) = broadcast::channel(event_buffer.max(1));

        let consumer = ConsumptionLoop {
            id: id.clone(),
            state: state.clone(),
            mailbox: mailbox.clone(),
            workflow,
            events: events.clone(),
        };
        let span = crate::runtime_span!(id);
        let handle = runtime.spawn(consumer.run().instrument(span));

        Self {
            id,
            state,
            mailbox,
            events,
            handle,
        }
    }

    pub(crate) fn snapshot(&self) -> RuntimeState<S> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent<S>> {
        self.events.subscribe()
    }
}

impl<S> RuntimeInstance<S> {
    pub(crate) fn mailbox(&self) -> &Arc<PriorityMailbox> {
        &self.mailbox
    }

    /// True while the consumption loop task has not finished.
    pub(crate) fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl<S> Drop for RuntimeInstance<S> {
    fn drop(&mut self) {
        self.handle.abort();
        self.mailbox.shutdown();
        trace!(runtime_id = %self.id, "runtime instance dropped");
    }
}

/// The single consumer of one instance's mailbox.
struct ConsumptionLoop<S> {
    id: RuntimeId,
    state: StateCell<S>,
    mailbox: Arc<PriorityMailbox>,
    workflow: BoxedWorkflow<S>,
    events: broadcast::Sender<RuntimeEvent<S>>,
}

impl<S> ConsumptionLoop<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn run(self) {
        debug!("consumption loop started");
        loop {
            match self.mailbox.take().await {
                Ok(activity) => self.process(activity).await,
                Err(MailboxError::Shutdown) => break,
                Err(e) => {
                    warn!(error = %e, "mailbox take failed");
                    break;
                }
            }
        }
        debug!("consumption loop stopped");
    }

    async fn process(&self, activity: Activity) {
        crate::log_activity!(activity.kind, "received", activity_id = %activity.id, priority = %activity.priority());

        let current = {
            let mut cell = self.write();
            cell.status = RuntimeStatus::Processing;
            cell.error = None;
            cell.last_updated = now_millis();
            cell.state.clone()
        };
        self.publish(RuntimeEvent::Received { activity: activity.clone() });

        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.workflow.process(&activity, &current))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed();
        self.mailbox.record_processing(elapsed);

        let result = match outcome {
            Ok(Ok(next)) => Ok(next),
            Ok(Err(error)) => Err(WorkflowError::execution(activity.id.clone(), &error)),
            Err(panic) => Err(WorkflowError::panicked(activity.id.clone(), panic_message(panic.as_ref()))),
        };

        match result {
            Ok(next) => {
                let snapshot = {
                    let mut cell = self.write();
                    cell.state = next;
                    cell.status = RuntimeStatus::Idle;
                    cell.error = None;
                    cell.last_updated = now_millis();
                    cell.processing.record(elapsed, true);
                    cell.clone()
                };
                crate::log_activity!(
                    activity.kind,
                    "processed",
                    activity_id = %activity.id,
                    duration_ms = elapsed.as_secs_f64() * 1000.0
                );
                self.publish(RuntimeEvent::Completed { activity, state: snapshot });
            }
            Err(error) => {
                {
                    let mut cell = self.write();
                    cell.status = RuntimeStatus::Error;
                    cell.error = Some(error.clone());
                    cell.last_updated = now_millis();
                    cell.processing.record(elapsed, false);
                }
                warn!(runtime_id = %self.id, activity_id = %activity.id, error = %error, "workflow failed");
                self.publish(RuntimeEvent::Failed { activity, error });
            }
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RuntimeState<S>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: RuntimeEvent<S>) {
        // No receivers just means nobody is observing.
        let _ = self.events.send(event);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "workflow panicked".to_string()
    }
}
