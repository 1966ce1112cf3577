//! Notifier port - fire-and-forget user notifications.
//!
//! Reconciliation must never block or fail on notification delivery, so
//! the port is a synchronous enqueue: implementations buffer and deliver
//! in the background, dropping to a dead-letter log when delivery keeps
//! failing.

use crate::domain::foundation::{AppointmentId, PaymentId, UserId};
use serde::{Deserialize, Serialize};

/// Notification kinds emitted by the payment flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    /// Provider: a payment for their appointment succeeded.
    PaymentReceived { amount: i64, currency: String },

    /// Payer: their payment succeeded.
    PaymentSuccess { amount: i64, currency: String },

    /// Payer: their payment failed.
    PaymentFailed { reason: Option<String> },

    /// Payer and payee: a refund was issued.
    RefundIssued { amount: i64, currency: String },
}

/// A notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub payment_id: PaymentId,
    pub appointment_id: AppointmentId,
    pub kind: NotificationKind,
}

/// Port for enqueueing notifications.
///
/// `notify` must be cheap and non-blocking; a full buffer drops the
/// notification (with a log line) rather than stalling the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}
