//! Payment ledger port - append-only persistence for payment rows.
//!
//! The ledger owns the only mutation primitive the reconciler is allowed
//! to use: `apply_transition`, a compare-and-swap on the status column.
//! There is no unconditional status update anywhere in the system.

use crate::domain::foundation::{AppointmentId, DomainError, PaymentId};
use crate::domain::payment::{Payment, PaymentStatus, PaymentTransition};
use async_trait::async_trait;

/// Result of a compare-and-swap transition attempt.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// The row matched an expected source status and was updated.
    Applied {
        /// The payment as stored after the update.
        payment: Payment,

        /// The status the row held immediately before the update. Lets
        /// callers detect edges like the first entry into `Refunded`
        /// without a read-then-write race.
        previous_status: PaymentStatus,
    },

    /// The row exists but its status was not in the expected source set.
    /// Nothing was written.
    Stale {
        /// The status found at write time.
        current_status: PaymentStatus,
    },
}

/// Port for payment persistence.
///
/// Rows are inserted once and never deleted; all later writes go through
/// `apply_transition`.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Insert a new payment row.
    ///
    /// Fails with `DuplicateExternalId` if a row with the same external
    /// transaction id already exists.
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Find a payment by its processor transaction id.
    async fn find_by_external_id(&self, external_id: &str)
        -> Result<Option<Payment>, DomainError>;

    /// Find a payment by internal id.
    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DomainError>;

    /// All payments recorded for an appointment, newest first.
    async fn find_by_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Vec<Payment>, DomainError>;

    /// Atomically apply a state transition if and only if the row's
    /// current status is one of the transition's expected sources.
    ///
    /// For refund transitions the stored `refunded_amount` is advanced to
    /// the clamped cumulative total in the same statement.
    async fn apply_transition(
        &self,
        payment_id: PaymentId,
        transition: &PaymentTransition,
    ) -> Result<TransitionOutcome, DomainError>;
}
