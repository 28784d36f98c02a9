use crate::activity::Activity;
use crate::errors::WorkflowError;
use crate::state::RuntimeState;

/// Progress of one activity through a runtime instance, published to observers.
///
/// Observers receive a copy of every event; observing never removes work from
/// the instance's mailbox.
#[derive(Clone, Debug)]
pub enum RuntimeEvent<S> {
    /// The consumption loop took the activity and is about to run the workflow.
    Received { activity: Activity },

    /// The workflow succeeded; `state` is the snapshot right after the update.
    Completed { activity: Activity, state: RuntimeState<S> },

    /// The workflow failed; the instance is now in the `ERROR` status.
    Failed { activity: Activity, error: WorkflowError },
}

impl<S> RuntimeEvent<S> {
    pub fn activity(&self) -> &Activity {
        match self {
            RuntimeEvent::Received { activity }
            | RuntimeEvent::Completed { activity, .. }
            | RuntimeEvent::Failed { activity, .. } => activity,
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.activity().correlation_id()
    }

    /// True once the workflow has finished with the activity, either way.
    pub fn is_outcome(&self) -> bool {
        !matches!(self, RuntimeEvent::Received { .. })
    }
}
