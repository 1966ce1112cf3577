//! Buffered notification queue with a background delivery worker.
//!
//! The reconciler calls `Notifier::notify` synchronously; this adapter
//! backs it with a bounded channel so the webhook path never blocks on
//! delivery. A background worker drains the channel, retries transient
//! failures a bounded number of times, and dead-letters the rest as a
//! structured log line.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::DomainError;
use crate::ports::{Notification, Notifier};

/// Delivery backend for notifications (push service, email bridge, ...).
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), DomainError>;
}

/// Delivery backend that emits notifications as structured log events.
///
/// Used when no push infrastructure is wired up; downstream log shipping
/// picks these up.
pub struct LogDelivery;

#[async_trait]
impl NotificationDelivery for LogDelivery {
    async fn deliver(&self, notification: &Notification) -> Result<(), DomainError> {
        tracing::info!(
            recipient = %notification.recipient,
            payment_id = %notification.payment_id,
            notification = ?notification.kind,
            "Notification delivered"
        );
        Ok(())
    }
}

/// Configuration for the notification queue.
#[derive(Debug, Clone)]
pub struct NotificationQueueConfig {
    /// Channel capacity; a full buffer drops new notifications.
    pub capacity: usize,

    /// Delivery attempts per notification before dead-lettering.
    pub max_attempts: u32,

    /// Delay between delivery attempts.
    pub retry_delay: Duration,
}

impl Default for NotificationQueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Synchronous enqueue half. Implements the `Notifier` port.
pub struct QueuedNotifier {
    sender: mpsc::Sender<Notification>,
}

impl Notifier for QueuedNotifier {
    fn notify(&self, notification: Notification) {
        // Non-blocking: a full buffer means notifications are dropped,
        // never that the webhook path stalls.
        if let Err(e) = self.sender.try_send(notification) {
            match e {
                mpsc::error::TrySendError::Full(n) => {
                    tracing::warn!(
                        recipient = %n.recipient,
                        payment_id = %n.payment_id,
                        "Notification buffer full - dropping notification"
                    );
                }
                mpsc::error::TrySendError::Closed(n) => {
                    tracing::warn!(
                        recipient = %n.recipient,
                        payment_id = %n.payment_id,
                        "Notification worker stopped - dropping notification"
                    );
                }
            }
        }
    }
}

/// Background worker that drains the queue and delivers notifications.
pub struct NotificationWorker {
    receiver: mpsc::Receiver<Notification>,
    delivery: Arc<dyn NotificationDelivery>,
    config: NotificationQueueConfig,
}

/// Create the enqueue half and the worker half of the notification queue.
pub fn notification_queue(
    delivery: Arc<dyn NotificationDelivery>,
    config: NotificationQueueConfig,
) -> (QueuedNotifier, NotificationWorker) {
    let (sender, receiver) = mpsc::channel(config.capacity);
    (
        QueuedNotifier { sender },
        NotificationWorker {
            receiver,
            delivery,
            config,
        },
    )
}

impl NotificationWorker {
    /// Run the delivery loop until the shutdown signal flips or all
    /// senders are dropped. Drains remaining buffered notifications on
    /// shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                maybe = self.receiver.recv() => {
                    match maybe {
                        Some(notification) => self.deliver_with_retry(notification).await,
                        None => return,
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.receiver.close();
                        while let Some(notification) = self.receiver.recv().await {
                            self.deliver_with_retry(notification).await;
                        }
                        return;
                    }
                }
            }
        }
    }

    async fn deliver_with_retry(&self, notification: Notification) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.delivery.deliver(&notification).await {
                Ok(()) => return,
                Err(e) if attempt < self.config.max_attempts && e.is_retryable() => {
                    tracing::warn!(
                        recipient = %notification.recipient,
                        attempt,
                        error = %e,
                        "Notification delivery failed - retrying"
                    );
                    time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    // Dead letter: the log line is the record.
                    tracing::error!(
                        recipient = %notification.recipient,
                        payment_id = %notification.payment_id,
                        notification = ?notification.kind,
                        error = %e,
                        "Notification dead-lettered after repeated failures"
                    );
                    return;
                }
            }
        }
    }
}
