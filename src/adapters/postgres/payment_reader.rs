//! PostgreSQL implementation of PaymentReader.
//!
//! Read-side queries over the payments table for history views.

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::payment::Payment;
use crate::ports::{PaymentReader, PaymentRole};
use async_trait::async_trait;
use sqlx::PgPool;

use super::payment_ledger::PaymentRow;

/// PostgreSQL implementation of the PaymentReader port.
pub struct PostgresPaymentReader {
    pool: PgPool,
}

impl PostgresPaymentReader {
    /// Creates a new PostgresPaymentReader with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentReader for PostgresPaymentReader {
    async fn list_for_user(
        &self,
        user_id: &UserId,
        role: PaymentRole,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Payment>, DomainError> {
        let role_column = match role {
            PaymentRole::Payer => "payer_id",
            PaymentRole::Payee => "payee_id",
        };

        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT id, external_id, appointment_id, service_id, payer_id, payee_id,
                   amount, fee_amount, currency, refunded_amount, status,
                   processor_customer_id, destination_account_id,
                   method_kind, method_brand, method_last4, failure_reason,
                   created_at, updated_at
            FROM payments
            WHERE {} = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            role_column
        ))
        .bind(user_id.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to list payments: {}", e),
            )
        })?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}
