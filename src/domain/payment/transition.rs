//! The payment state machine as an explicit transition table.
//!
//! Every processor event kind maps to at most one transition: a target
//! status plus the set of source statuses from which that edge is legal.
//! The ledger applies a transition only when the stored status is still one
//! of the expected sources at write time (compare-and-swap), which is what
//! makes concurrent and duplicated webhook delivery safe.
//!
//! Terminal states admit no edges except `Succeeded -> Refunded` (and the
//! amount-accumulating `Refunded -> Refunded`).

use super::events::GatewayEventKind;
use super::payment::PaymentMethodSummary;
use super::status::PaymentStatus;

/// Sources from which a payment can settle (succeed, fail, or cancel).
const SETTLEABLE: &[PaymentStatus] = &[
    PaymentStatus::Pending,
    PaymentStatus::Processing,
    PaymentStatus::RequiresAction,
];

/// Sources for the `Processing` edge. Excludes `Processing` itself so a
/// redelivered processing event is a clean CAS no-op.
const TO_PROCESSING: &[PaymentStatus] = &[PaymentStatus::Pending, PaymentStatus::RequiresAction];

/// Sources for the `RequiresAction` edge.
const TO_REQUIRES_ACTION: &[PaymentStatus] = &[PaymentStatus::Pending, PaymentStatus::Processing];

/// Sources for the refund edge: the one legal exit from a terminal state,
/// plus `Refunded` itself so later partial refunds keep accumulating.
const REFUNDABLE: &[PaymentStatus] = &[PaymentStatus::Succeeded, PaymentStatus::Refunded];

/// A fully-described state transition ready for the ledger's CAS.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentTransition {
    /// Status to write.
    pub target: PaymentStatus,

    /// Statuses the row must still be in for the write to apply.
    pub expected_sources: &'static [PaymentStatus],

    /// Cumulative refunded total reported by the processor, for refund
    /// transitions. Clamped by the ledger to `[current, amount]`.
    pub refund_total: Option<i64>,

    /// Instrument summary to capture, for success transitions.
    pub method_summary: Option<PaymentMethodSummary>,

    /// Processor-reported reason, for failure transitions.
    pub failure_reason: Option<String>,
}

impl PaymentTransition {
    fn to(target: PaymentStatus, expected_sources: &'static [PaymentStatus]) -> Self {
        Self {
            target,
            expected_sources,
            refund_total: None,
            method_summary: None,
            failure_reason: None,
        }
    }
}

/// Look up the transition for an event kind.
///
/// Returns `None` for kinds that do not drive the payment state machine
/// (account events, unknown events).
pub fn transition_for(kind: &GatewayEventKind) -> Option<PaymentTransition> {
    match kind {
        GatewayEventKind::PaymentSucceeded { method_summary, .. } => {
            let mut t = PaymentTransition::to(PaymentStatus::Succeeded, SETTLEABLE);
            t.method_summary = method_summary.clone();
            Some(t)
        }
        GatewayEventKind::PaymentFailed { reason, .. } => {
            let mut t = PaymentTransition::to(PaymentStatus::Failed, SETTLEABLE);
            t.failure_reason = reason.clone();
            Some(t)
        }
        GatewayEventKind::PaymentCanceled { .. } => {
            Some(PaymentTransition::to(PaymentStatus::Canceled, SETTLEABLE))
        }
        GatewayEventKind::PaymentProcessing { .. } => {
            Some(PaymentTransition::to(PaymentStatus::Processing, TO_PROCESSING))
        }
        GatewayEventKind::PaymentRequiresAction { .. } => Some(PaymentTransition::to(
            PaymentStatus::RequiresAction,
            TO_REQUIRES_ACTION,
        )),
        GatewayEventKind::ChargeRefunded {
            amount_refunded, ..
        } => {
            let mut t = PaymentTransition::to(PaymentStatus::Refunded, REFUNDABLE);
            t.refund_total = Some(*amount_refunded);
            Some(t)
        }
        GatewayEventKind::AccountUpdated { .. } | GatewayEventKind::Unknown { .. } => None,
    }
}

/// Why a CAS came back stale, for logging and the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleKind {
    /// The row is already in the target status: a redelivery.
    Duplicate,

    /// A refund event arrived while the payment has not yet recorded
    /// success. The sender is asked to redeliver later.
    RefundBeforeSuccess,

    /// Any other mismatch, e.g. success arriving after failure was
    /// recorded. Acknowledged, logged for audit, and discarded.
    Conflicting,
}

/// Classify a stale CAS result given the status found at write time.
pub fn classify_stale(current: PaymentStatus, transition: &PaymentTransition) -> StaleKind {
    if current == transition.target {
        StaleKind::Duplicate
    } else if transition.target == PaymentStatus::Refunded && !current.is_terminal() {
        StaleKind::RefundBeforeSuccess
    } else {
        StaleKind::Conflicting
    }
}
