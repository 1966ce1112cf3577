//! Notification adapter - buffered fire-and-forget delivery.

mod queue;

pub use queue::{
    notification_queue, LogDelivery, NotificationDelivery, NotificationQueueConfig,
    NotificationWorker, QueuedNotifier,
};
