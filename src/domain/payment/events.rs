//! Processor webhook events as a closed sum type.
//!
//! The gateway verifies and parses raw webhook payloads into these kinds;
//! everything downstream of verification works with this type, never with
//! provider-specific JSON.

use serde::{Deserialize, Serialize};

use crate::domain::provider::AccountCapabilitySnapshot;

use super::payment::PaymentMethodSummary;

/// A verified webhook event from the payment processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Processor event id (evt_...), used for log correlation.
    pub id: String,

    /// Classified event payload.
    pub kind: GatewayEventKind,

    /// Unix timestamp when the processor created the event.
    pub created_at: i64,
}

/// The closed set of event kinds the reconciler understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayEventKind {
    /// Payment captured successfully.
    PaymentSucceeded {
        external_id: String,
        method_summary: Option<PaymentMethodSummary>,
    },

    /// Payment definitively failed.
    PaymentFailed {
        external_id: String,
        reason: Option<String>,
    },

    /// Processor started moving funds.
    PaymentProcessing { external_id: String },

    /// Payer must complete an additional step.
    PaymentRequiresAction { external_id: String },

    /// Intent canceled before capture.
    PaymentCanceled { external_id: String },

    /// Charge refunded, partially or fully. `amount_refunded` is the
    /// cumulative refunded total as reported by the processor.
    ChargeRefunded {
        external_id: String,
        amount_refunded: i64,
    },

    /// Connected-account capability state changed.
    AccountUpdated {
        account_id: String,
        snapshot: AccountCapabilitySnapshot,
    },

    /// Event type we do not handle; acknowledged and ignored.
    Unknown { event_type: String },
}

impl GatewayEventKind {
    /// The external transaction id this event targets, if any.
    pub fn external_id(&self) -> Option<&str> {
        match self {
            GatewayEventKind::PaymentSucceeded { external_id, .. }
            | GatewayEventKind::PaymentFailed { external_id, .. }
            | GatewayEventKind::PaymentProcessing { external_id }
            | GatewayEventKind::PaymentRequiresAction { external_id }
            | GatewayEventKind::PaymentCanceled { external_id }
            | GatewayEventKind::ChargeRefunded { external_id, .. } => Some(external_id),
            GatewayEventKind::AccountUpdated { .. } | GatewayEventKind::Unknown { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_events_expose_external_id() {
        let kind = GatewayEventKind::PaymentSucceeded {
            external_id: "pi_123".to_string(),
            method_summary: None,
        };
        assert_eq!(kind.external_id(), Some("pi_123"));
    }

    #[test]
    fn account_events_have_no_external_id() {
        let kind = GatewayEventKind::AccountUpdated {
            account_id: "acct_123".to_string(),
            snapshot: AccountCapabilitySnapshot {
                charges_enabled: true,
                payouts_enabled: true,
                disabled_reason: None,
                past_due: vec![],
                currently_due: vec![],
            },
        };
        assert_eq!(kind.external_id(), None);
    }
}
