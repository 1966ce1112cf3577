//! Payment status lifecycle.
//!
//! A payment moves through non-terminal states (`Pending`, `Processing`,
//! `RequiresAction`) until it reaches a terminal state (`Succeeded`,
//! `Failed`, `Canceled`, `Refunded`). The single legal exit from a terminal
//! state is `Succeeded -> Refunded`; everything else is final.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a payment as reconciled from processor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Intent created, awaiting confirmation from the payer.
    Pending,

    /// Processor is moving the funds.
    Processing,

    /// Payer must complete an additional step (3DS, etc.).
    RequiresAction,

    /// Funds captured; platform fee and provider payout settled.
    Succeeded,

    /// Processor reported a definitive failure.
    Failed,

    /// Intent canceled before capture.
    Canceled,

    /// Partially or fully refunded after success.
    Refunded,
}

impl PaymentStatus {
    /// All non-terminal statuses.
    pub const NON_TERMINAL: [PaymentStatus; 3] = [
        PaymentStatus::Pending,
        PaymentStatus::Processing,
        PaymentStatus::RequiresAction,
    ];

    /// Statuses that block creating a new intent for the same appointment.
    /// Failed and canceled payments do not block a retry.
    pub const BLOCKS_NEW_INTENT: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::Processing,
        PaymentStatus::RequiresAction,
        PaymentStatus::Succeeded,
        PaymentStatus::Refunded,
    ];

    /// Check whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Succeeded
                | PaymentStatus::Failed
                | PaymentStatus::Canceled
                | PaymentStatus::Refunded
        )
    }

    /// Stable string code used in the database and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::RequiresAction => "requires_action",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Parse the stable string code.
    pub fn parse(s: &str) -> Option<PaymentStatus> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "processing" => Some(PaymentStatus::Processing),
            "requires_action" => Some(PaymentStatus::RequiresAction),
            "succeeded" => Some(PaymentStatus::Succeeded),
            "failed" => Some(PaymentStatus::Failed),
            "canceled" => Some(PaymentStatus::Canceled),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    /// Map the processor's initial intent status to a local status.
    ///
    /// Unrecognized processor statuses start as `Pending`; the webhook
    /// stream corrects them.
    pub fn from_processor_initial(s: &str) -> PaymentStatus {
        match s {
            "processing" => PaymentStatus::Processing,
            "requires_action" | "requires_confirmation" | "requires_payment_method" => {
                PaymentStatus::RequiresAction
            }
            "succeeded" => PaymentStatus::Succeeded,
            "canceled" => PaymentStatus::Canceled,
            _ => PaymentStatus::Pending,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
