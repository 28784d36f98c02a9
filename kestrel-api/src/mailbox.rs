use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::activity::Activity;
use crate::errors::MailboxError;
use crate::state::MailboxStats;

/// Abstract interface for a runtime instance's inbox.
///
/// Implementors must deliver activities of equal priority in FIFO order and
/// must never buffer without bound: a full queue throttles the producer.
#[async_trait]
pub trait Mailbox: Send + Sync + std::fmt::Debug {
    /// Enqueues an activity, waiting while its queue is full.
    ///
    /// Gives up with `MailboxError::Timeout` once the activity's own timeout
    /// (or the mailbox default) elapses, counting the timeout in the stats.
    async fn offer(&self, activity: Activity) -> Result<(), MailboxError>;

    /// Enqueues an activity without waiting, failing with `MailboxError::Full`.
    fn try_offer(&self, activity: Activity) -> Result<(), MailboxError>;

    /// Removes the next activity, waiting while the mailbox is empty.
    async fn take(&self) -> Result<Activity, MailboxError>;

    /// Reports that the consumer finished one activity after `elapsed`.
    fn record_processing(&self, elapsed: Duration);

    fn stats(&self) -> MailboxStats;

    /// Number of queued activities (snapshot in time).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of activities the mailbox can hold.
    fn capacity(&self) -> usize;

    /// Closes the mailbox. Queued activities are discarded and every later
    /// `offer` or `take` fails with `MailboxError::Shutdown`.
    fn shutdown(&self);

    fn is_shutdown(&self) -> bool;
}

/// Turns a mailbox into the continuous stream of its activities.
///
/// Each item is produced by one `take()`, so the stream competes with any
/// other taker. The stream ends once the mailbox shuts down and cannot be
/// restarted.
pub fn subscribe<M>(mailbox: Arc<M>) -> BoxStream<'static, Activity>
where
    M: Mailbox + ?Sized + 'static,
{
    stream::unfold(mailbox, |mailbox| async move {
        match mailbox.take().await {
            Ok(activity) => Some((activity, mailbox)),
            Err(_) => None,
        }
    })
    .boxed()
}
