//! Read-side port for payment history views.

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::payment::Payment;
use async_trait::async_trait;

/// Which side of a payment the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRole {
    /// Pet owner: payments they made.
    Payer,

    /// Provider: payments they received.
    Payee,
}

/// Port for payment list queries. Separate from the ledger so read
/// models can diverge from the write path later.
#[async_trait]
pub trait PaymentReader: Send + Sync {
    /// Payments where the user holds the given role, newest first.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        role: PaymentRole,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Payment>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_reader_is_object_safe() {
        fn _accepts_dyn(_reader: &dyn PaymentReader) {}
    }
}
