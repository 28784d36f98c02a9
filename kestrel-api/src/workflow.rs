use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::activity::Activity;

/// Business logic run by a runtime instance once per activity.
///
/// A workflow maps the activity and the instance's current state to the next
/// state. Returning an error leaves the state untouched and marks the instance
/// as failed for that activity; the instance keeps consuming afterwards.
#[async_trait]
pub trait Workflow<S>: Send + Sync + 'static
where
    S: Send + Sync + 'static,
{
    async fn process(&self, activity: &Activity, state: &S) -> anyhow::Result<S>;
}

/// Shared, type-erased workflow.
pub type BoxedWorkflow<S> = Arc<dyn Workflow<S>>;

/// Workflow backed by a plain closure.
pub struct FnWorkflow<S>(Arc<dyn Fn(&Activity, &S) -> anyhow::Result<S> + Send + Sync>);

impl<S> Clone for FnWorkflow<S> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<S> Debug for FnWorkflow<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FnWorkflow(<function>)")
    }
}

impl<S> FnWorkflow<S> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Activity, &S) -> anyhow::Result<S> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

#[async_trait]
impl<S> Workflow<S> for FnWorkflow<S>
where
    S: Send + Sync + 'static,
{
    async fn process(&self, activity: &Activity, state: &S) -> anyhow::Result<S> {
        (self.0)(activity, state)
    }
}

#[async_trait]
impl<S, W> Workflow<S> for Arc<W>
where
    S: Send + Sync + 'static,
    W: Workflow<S> + ?Sized,
{
    async fn process(&self, activity: &Activity, state: &S) -> anyhow::Result<S> {
        (**self).process(activity, state).await
    }
}
