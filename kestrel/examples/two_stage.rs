//! Two agents chained by a supervisor: a drafting agent produces a summary,
//! then a reviewing agent approves it. Run with `--fail` to see the reviewer
//! reject the draft and the whole process fail.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use kestrel::{logging, Registry, RegistryConfig, Supervisor, SupervisorConfig};
use kestrel_api::{Activity, ActivityPriority, ProcessState, Workflow};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct AgentState {
    drafts: u32,
    last_note: Option<String>,
}

struct Drafter;

#[async_trait]
impl Workflow<AgentState> for Drafter {
    async fn process(&self, activity: &Activity, state: &AgentState) -> Result<AgentState> {
        // Stand-in for a call to a text generation service.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let stage = activity.payload["stage"].as_str().unwrap_or("manual");
        Ok(AgentState {
            drafts: state.drafts + 1,
            last_note: Some(format!("draft #{} ({stage})", state.drafts + 1)),
        })
    }
}

struct Reviewer {
    reject: bool,
}

#[async_trait]
impl Workflow<AgentState> for Reviewer {
    async fn process(&self, _activity: &Activity, state: &AgentState) -> Result<AgentState> {
        if self.reject {
            anyhow::bail!("draft rejected by reviewer");
        }
        Ok(AgentState {
            drafts: state.drafts,
            last_note: Some("approved".to_string()),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_development();
    let reject = std::env::args().any(|arg| arg == "--fail");

    let registry = Arc::new(Registry::new(RegistryConfig::default()));
    registry.create("drafter", AgentState::default(), Drafter)?;
    registry.create("reviewer", AgentState::default(), Reviewer { reject })?;

    // Unrelated traffic does not disturb the supervised process.
    registry
        .send(
            "drafter",
            Activity::event("drafter", json!({ "stage": "warm-up" })).with_priority(ActivityPriority::Background),
        )
        .await?;

    let supervisor = Supervisor::new(registry.clone(), "drafter", "reviewer", SupervisorConfig::default());
    let outcome = supervisor.run().await?;

    info!(process = %serde_json::to_string(&outcome)?, "process finished");
    for id in registry.ids() {
        let state = registry.get_state(&id)?;
        info!(runtime_id = %id, status = ?state.status, note = ?state.state.last_note, "final state");
    }

    registry.shutdown();
    if outcome.state == ProcessState::Failed {
        std::process::exit(1);
    }
    Ok(())
}
