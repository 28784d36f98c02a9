#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use kestrel::{logging, Registry, RegistryConfig};
use kestrel_api::{Activity, FnWorkflow, RuntimeState, Workflow};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// State used by most runtime tests
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub count: u64,
}

/// Creates a registry on the current runtime with quiet logging
pub fn setup_registry() -> Registry<Counter> {
    logging::init_test();
    Registry::new(RegistryConfig::default())
}

/// Increments the counter; fails on payloads carrying `"fail": true`
/// and panics on payloads carrying `"panic": true`.
pub fn counter_workflow() -> FnWorkflow<Counter> {
    FnWorkflow::new(|activity: &Activity, state: &Counter| {
        if activity.payload["panic"] == json!(true) {
            panic!("workflow exploded");
        }
        if activity.payload["fail"] == json!(true) {
            anyhow::bail!("refusing activity {}", activity.id);
        }
        Ok(Counter { count: state.count + 1 })
    })
}

pub fn increment(runtime_id: &str) -> Activity {
    Activity::command(runtime_id, json!({ "op": "increment" }))
}

pub fn failing(runtime_id: &str) -> Activity {
    Activity::command(runtime_id, json!({ "fail": true }))
}

pub fn panicking(runtime_id: &str) -> Activity {
    Activity::command(runtime_id, json!({ "panic": true }))
}

/// Counter workflow that holds every activity until a permit is released,
/// recording the `label` of each activity it processes. Activities carrying
/// `"fail": true` fail immediately without waiting.
#[derive(Clone)]
pub struct GatedCounter {
    gate: Arc<tokio::sync::Semaphore>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl GatedCounter {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(tokio::sync::Semaphore::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn release(&self, activities: usize) {
        self.gate.add_permits(activities);
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Workflow<Counter> for GatedCounter {
    async fn process(&self, activity: &Activity, state: &Counter) -> anyhow::Result<Counter> {
        if activity.payload["fail"] == json!(true) {
            anyhow::bail!("refusing activity {}", activity.id);
        }
        self.gate.acquire().await?.forget();
        let label = activity.payload["label"].as_str().unwrap_or_default().to_string();
        self.seen.lock().unwrap().push(label);
        Ok(Counter { count: state.count + 1 })
    }
}

/// Default upper bound for waiting on asynchronous processing
pub const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Polls an instance until `predicate` holds, panicking after `WAIT_LIMIT`
pub async fn wait_for_state<S, F>(registry: &Registry<S>, id: &str, predicate: F) -> RuntimeState<S>
where
    S: Clone + Send + Sync + std::fmt::Debug + 'static,
    F: Fn(&RuntimeState<S>) -> bool,
{
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        let state = registry.get_state(id).expect("runtime should be registered");
        if predicate(&state) {
            return state;
        }
        if Instant::now() > deadline {
            panic!("timed out waiting for runtime {id}, last state: {state:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
