//! # Process Supervisor
//!
//! Runs two registered instances as one logical operation: Task A first, then
//! Task B, failing the whole process as soon as either task fails. The
//! supervisor never executes task logic itself. It only sends start commands
//! carrying the process correlation id and reacts to the tasks' runtime
//! events for that id.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kestrel::{Registry, RegistryConfig, Supervisor, SupervisorConfig};
//! use kestrel_api::{FnWorkflow, ProcessState};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = Arc::new(Registry::new(RegistryConfig::default()));
//! registry.create("extract", 0u32, FnWorkflow::new(|_, n: &u32| Ok(n + 1)))?;
//! registry.create("publish", 0u32, FnWorkflow::new(|_, n: &u32| Ok(n + 1)))?;
//!
//! let supervisor = Supervisor::new(registry, "extract", "publish", SupervisorConfig::default());
//! let outcome = supervisor.run().await?;
//! assert_eq!(outcome.state, ProcessState::Completed);
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use kestrel_api::activity::Activity;
use kestrel_api::errors::SupervisorError;
use kestrel_api::event::RuntimeEvent;
use kestrel_api::supervisor::{ProcessSnapshot, ProcessState, Stage, SupervisorEvent};
use kestrel_api::types::{now_millis, RuntimeId};

use crate::config::SupervisorConfig;
use crate::runtime::{Observation, Registry, RuntimeSubscription};

/// Supervisor of one two-stage process.
#[derive(Debug)]
pub struct Supervisor<S> {
    registry: Arc<Registry<S>>,
    task_a: RuntimeId,
    task_b: RuntimeId,
    config: SupervisorConfig,
    process: Mutex<ProcessSnapshot>,
}

impl<S> Supervisor<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates an idle supervisor over two registered instances, with a fresh correlation id.
    pub fn new(
        registry: Arc<Registry<S>>,
        task_a: impl Into<RuntimeId>,
        task_b: impl Into<RuntimeId>,
        config: SupervisorConfig,
    ) -> Self {
        Self::with_correlation_id(registry, task_a, task_b, config, Uuid::new_v4().to_string())
    }

    pub fn with_correlation_id(
        registry: Arc<Registry<S>>,
        task_a: impl Into<RuntimeId>,
        task_b: impl Into<RuntimeId>,
        config: SupervisorConfig,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            task_a: task_a.into(),
            task_b: task_b.into(),
            config,
            process: Mutex::new(ProcessSnapshot::new(correlation_id)),
        }
    }

    pub fn snapshot(&self) -> ProcessSnapshot {
        self.process.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn state(&self) -> ProcessState {
        self.process.lock().unwrap_or_else(PoisonError::into_inner).state
    }

    pub fn correlation_id(&self) -> String {
        self.process
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .correlation_id
            .clone()
    }

    fn task(&self, stage: Stage) -> &str {
        match stage {
            Stage::TaskA => &self.task_a,
            Stage::TaskB => &self.task_b,
        }
    }

    /// Applies one event to the process and performs its side effect.
    ///
    /// Events not accepted in the current state are rejected with
    /// `InvalidTransition` and leave the process untouched. When a start
    /// command cannot be delivered the process fails with the delivery error.
    pub async fn dispatch(&self, event: SupervisorEvent) -> Result<ProcessState, SupervisorError> {
        let (from, to, correlation_id) = {
            let mut process = self.process.lock().unwrap_or_else(PoisonError::into_inner);
            let from = process.state;
            let to = from.next(&event)?;

            process.state = to;
            match &event {
                SupervisorEvent::StartProcess => process.started_at = Some(now_millis()),
                SupervisorEvent::TaskAFailed { error } | SupervisorEvent::TaskBFailed { error } => {
                    process.error = Some(error.clone());
                    process.completed_at = Some(now_millis());
                }
                SupervisorEvent::TaskBCompleted => process.completed_at = Some(now_millis()),
                SupervisorEvent::TaskACompleted => {}
            }
            (from, to, process.correlation_id.clone())
        };
        info!(
            correlation_id = %correlation_id,
            event = event.name(),
            from = %from,
            to = %to,
            "process transition"
        );

        let start = match event {
            SupervisorEvent::StartProcess => Some(Stage::TaskA),
            SupervisorEvent::TaskACompleted => Some(Stage::TaskB),
            _ => None,
        };
        if let Some(stage) = start {
            if let Err(error) = self.start_task(stage, &correlation_id).await {
                warn!(correlation_id = %correlation_id, stage = %stage, error = %error, "failed to start task");
                return self.fail_delivery(stage, error.to_string());
            }
        }
        Ok(to)
    }

    async fn start_task(&self, stage: Stage, correlation_id: &str) -> Result<(), SupervisorError> {
        let task = self.task(stage);
        let mut command = Activity::command(
            task,
            json!({ "command": "start", "stage": stage.to_string(), "process": correlation_id }),
        )
        .with_priority(self.config.start_priority)
        .with_correlation_id(correlation_id);
        if let Some(timeout) = self.config.start_timeout {
            command = command.with_timeout(timeout);
        }

        self.registry.send(task, command).await?;
        Ok(())
    }

    fn fail_delivery(&self, stage: Stage, error: String) -> Result<ProcessState, SupervisorError> {
        let mut process = self.process.lock().unwrap_or_else(PoisonError::into_inner);
        process.state = ProcessState::Failed;
        process.error = Some(format!("failed to start {stage}: {error}"));
        process.completed_at = Some(now_millis());
        Ok(ProcessState::Failed)
    }

    /// Drives the whole process to a terminal state and returns its record.
    ///
    /// Both task instances are subscribed to before anything is started, so
    /// no outcome can be missed. A task counts as failed when its event
    /// stream closes before it reports an outcome (e.g. it was terminated) or
    /// when the supervisor falls so far behind the task's events that the
    /// outcome may have been dropped.
    pub async fn run(&self) -> Result<ProcessSnapshot, SupervisorError> {
        let mut task_a_events = self.registry.subscribe(&self.task_a)?;
        let mut task_b_events = self.registry.subscribe(&self.task_b)?;
        let correlation_id = self.correlation_id();

        if self.dispatch(SupervisorEvent::StartProcess).await?.is_terminal() {
            return Ok(self.snapshot());
        }

        let outcome = await_outcome(Stage::TaskA, &mut task_a_events, &correlation_id).await;
        // Task B has not been started yet, so nothing published so far concerns this process.
        task_b_events.skip_backlog();
        if self.dispatch(outcome).await?.is_terminal() {
            return Ok(self.snapshot());
        }

        let outcome = await_outcome(Stage::TaskB, &mut task_b_events, &correlation_id).await;
        self.dispatch(outcome).await?;
        Ok(self.snapshot())
    }
}

/// Waits for the task's outcome on the process's start command.
async fn await_outcome<S>(
    stage: Stage,
    events: &mut RuntimeSubscription<S>,
    correlation_id: &str,
) -> SupervisorEvent
where
    S: Clone + Send + 'static,
{
    while let Some(observation) = events.observe().await {
        let event = match observation {
            Observation::Event(event) => event,
            Observation::Lagged(skipped) => {
                warn!(
                    correlation_id = %correlation_id,
                    runtime_id = %events.runtime_id(),
                    skipped,
                    "supervisor lagged behind task events"
                );
                return stage.failed(format!(
                    "lost track of runtime {} after skipping {skipped} events",
                    events.runtime_id()
                ));
            }
        };
        if event.correlation_id() != Some(correlation_id) {
            continue;
        }
        match event {
            RuntimeEvent::Completed { .. } => return stage.completed(),
            RuntimeEvent::Failed { error, .. } => return stage.failed(error.to_string()),
            RuntimeEvent::Received { .. } => {}
        }
    }
    stage.failed(format!("runtime {} stopped before finishing", events.runtime_id()))
}
