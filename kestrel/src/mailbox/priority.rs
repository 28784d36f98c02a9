use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use flume::{Receiver, Sender, TryRecvError, TrySendError};
use tokio::sync::Notify;
use tracing::{debug, warn};

use kestrel_api::activity::Activity;
use kestrel_api::errors::MailboxError;
use kestrel_api::mailbox::Mailbox;
use kestrel_api::state::MailboxStats;

use crate::config::MailboxConfig;

/// A bounded, priority-aware mailbox built from flume channels.
///
/// With prioritization enabled the mailbox owns one bounded channel per
/// priority level and `take` always drains the most urgent non-empty one
/// (strict priority, so sustained HIGH traffic starves lower levels). With
/// prioritization disabled every activity goes through a single FIFO channel.
/// Within a channel delivery is FIFO.
#[derive(Debug)]
pub struct PriorityMailbox {
    /// Owner of the mailbox, used for logging
    owner: String,
    config: MailboxConfig,
    /// Sending halves, one per lane, in delivery order
    senders: Vec<Sender<Activity>>,
    /// Receiving halves; cleared on shutdown, which disconnects every lane
    receivers: RwLock<Vec<Receiver<Activity>>>,
    /// Wakes takers waiting on an empty mailbox
    notify: Notify,
    is_shutdown: AtomicBool,
    processed: AtomicU64,
    timeouts: AtomicU64,
    processing_time_ns: AtomicU64,
}

impl PriorityMailbox {
    /// Creates a mailbox for `owner` with the lane layout described by `config`.
    pub fn new(owner: impl Into<String>, config: MailboxConfig) -> Self {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..config.lanes())
            .map(|_| flume::bounded(config.lane_capacity()))
            .unzip();

        Self {
            owner: owner.into(),
            config,
            senders,
            receivers: RwLock::new(receivers),
            notify: Notify::new(),
            is_shutdown: AtomicBool::new(false),
            processed: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            processing_time_ns: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }

    /// Lane an activity is queued on.
    fn lane_for(&self, activity: &Activity) -> usize {
        if self.config.enable_prioritization {
            activity.priority().index()
        } else {
            0
        }
    }

    /// Takes the head of the first non-empty lane, in delivery order.
    fn poll_lanes(&self) -> Result<Option<Activity>, MailboxError> {
        if self.is_shutdown() {
            return Err(MailboxError::Shutdown);
        }
        let receivers = self.receivers.read().unwrap_or_else(PoisonError::into_inner);
        for receiver in receivers.iter() {
            match receiver.try_recv() {
                Ok(activity) => return Ok(Some(activity)),
                Err(TryRecvError::Empty) => continue,
                Err(TryRecvError::Disconnected) => return Err(MailboxError::Shutdown),
            }
        }
        Ok(None)
    }

    fn enqueued(&self) {
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl Mailbox for PriorityMailbox {
    async fn offer(&self, activity: Activity) -> Result<(), MailboxError> {
        if self.is_shutdown() {
            return Err(MailboxError::Shutdown);
        }

        let timeout = activity.timeout().unwrap_or(self.config.default_timeout);
        let sender = &self.senders[self.lane_for(&activity)];
        let activity_id = activity.id.clone();

        // Waits for room on a full lane; shutdown drops the receivers and releases the wait.
        match tokio::time::timeout(timeout, sender.send_async(activity)).await {
            Ok(Ok(())) => {
                self.enqueued();
                Ok(())
            }
            Ok(Err(_)) => Err(MailboxError::Shutdown),
            Err(_) => {
                self.timeouts.fetch_add(1, Ordering::SeqCst);
                warn!(
                    owner = %self.owner,
                    activity_id = %activity_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "mailbox offer timed out"
                );
                Err(MailboxError::Timeout { timeout })
            }
        }
    }

    fn try_offer(&self, activity: Activity) -> Result<(), MailboxError> {
        if self.is_shutdown() {
            return Err(MailboxError::Shutdown);
        }

        match self.senders[self.lane_for(&activity)].try_send(activity) {
            Ok(()) => {
                self.enqueued();
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(MailboxError::Full {
                capacity: self.config.lane_capacity(),
            }),
            Err(TrySendError::Disconnected(_)) => Err(MailboxError::Shutdown),
        }
    }

    async fn take(&self) -> Result<Activity, MailboxError> {
        loop {
            // Register interest before checking the lanes so an offer landing
            // in between still wakes us.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(activity) = self.poll_lanes()? {
                return Ok(activity);
            }
            notified.await;
        }
    }

    fn record_processing(&self, elapsed: Duration) {
        self.processed.fetch_add(1, Ordering::SeqCst);
        self.processing_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::SeqCst);
    }

    fn stats(&self) -> MailboxStats {
        let processed = self.processed.load(Ordering::SeqCst);
        let total_ns = self.processing_time_ns.load(Ordering::SeqCst);
        let avg_processing_time = if processed == 0 {
            0.0
        } else {
            total_ns as f64 / processed as f64 / 1_000_000.0
        };

        MailboxStats {
            size: self.len(),
            processed,
            timeouts: self.timeouts.load(Ordering::SeqCst),
            avg_processing_time,
        }
    }

    fn len(&self) -> usize {
        let receivers = self.receivers.read().unwrap_or_else(PoisonError::into_inner);
        receivers.iter().map(Receiver::len).sum()
    }

    fn capacity(&self) -> usize {
        self.config.lanes() * self.config.lane_capacity()
    }

    fn shutdown(&self) {
        if self.is_shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        // Dropping every receiver disconnects the lanes: queued activities are
        // discarded and offers blocked on a full lane fail.
        let dropped = {
            let mut receivers = self.receivers.write().unwrap_or_else(PoisonError::into_inner);
            let pending = receivers.iter().map(Receiver::len).sum::<usize>();
            receivers.clear();
            pending
        };
        debug!(owner = %self.owner, discarded = dropped, "mailbox shut down");

        self.notify.notify_waiters();
    }

    fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }
}
