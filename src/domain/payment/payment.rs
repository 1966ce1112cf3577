//! Payment entity - one money-movement attempt tied to one appointment.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AppointmentId, PaymentId, ServiceId, Timestamp, UserId};

use super::status::PaymentStatus;

/// Non-sensitive summary of the instrument used, captured on success.
/// Never contains raw card data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodSummary {
    /// Instrument kind ("card", "link", ...).
    pub kind: String,

    /// Card brand, when the instrument is a card.
    pub brand: Option<String>,

    /// Last four digits, when the instrument is a card.
    pub last4: Option<String>,
}

/// A single money-movement attempt for an appointment.
///
/// Created once by the orchestrator and never deleted; webhook
/// reconciliation appends status transitions and refund accumulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,

    /// Processor transaction id (pi_...). Unique and immutable once set.
    pub external_id: String,

    pub appointment_id: AppointmentId,
    pub service_id: ServiceId,

    /// Pet owner being charged.
    pub payer_id: UserId,

    /// Provider receiving the payout.
    pub payee_id: UserId,

    /// Total charge in minor currency units.
    pub amount: i64,

    /// Platform fee in minor currency units, `0 <= fee < amount`.
    pub fee_amount: i64,

    /// ISO currency code, lowercase.
    pub currency: String,

    /// Cumulative refunded amount, clamped to `[0, amount]`.
    pub refunded_amount: i64,

    pub status: PaymentStatus,

    /// Processor customer id of the payer.
    pub processor_customer_id: String,

    /// Processor connected-account id of the payee.
    pub destination_account_id: String,

    /// Set only when a success event carried instrument details.
    pub method_summary: Option<PaymentMethodSummary>,

    /// Processor-reported reason, set on failure.
    pub failure_reason: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Clamp a processor-reported cumulative refund total to this
    /// payment's amount. Refunds accumulate monotonically; the processor's
    /// figure is authoritative but never allowed to exceed the charge.
    pub fn clamp_refund_total(&self, reported_total: i64) -> i64 {
        reported_total.clamp(self.refunded_amount, self.amount)
    }

    /// Whether this payment blocks creating another intent for the same
    /// appointment.
    pub fn blocks_new_intent(&self) -> bool {
        PaymentStatus::BLOCKS_NEW_INTENT.contains(&self.status)
    }
}
