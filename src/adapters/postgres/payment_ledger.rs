//! PostgreSQL implementation of PaymentLedger.
//!
//! Payments are insert-once rows; every later write goes through
//! `apply_transition`, a single-statement compare-and-swap on the status
//! column. The CAS is what makes duplicated and out-of-order webhook
//! delivery safe under concurrency.

use crate::domain::foundation::{
    AppointmentId, DomainError, ErrorCode, PaymentId, ServiceId, Timestamp, UserId,
};
use crate::domain::payment::{Payment, PaymentMethodSummary, PaymentStatus, PaymentTransition};
use crate::ports::{PaymentLedger, TransitionOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the PaymentLedger port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresPaymentLedger {
    pool: PgPool,
}

impl PostgresPaymentLedger {
    /// Creates a new PostgresPaymentLedger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PAYMENT_COLUMNS: &str = r#"
    id, external_id, appointment_id, service_id, payer_id, payee_id,
    amount, fee_amount, currency, refunded_amount, status,
    processor_customer_id, destination_account_id,
    method_kind, method_brand, method_last4, failure_reason,
    created_at, updated_at
"#;

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct PaymentRow {
    pub id: Uuid,
    pub external_id: String,
    pub appointment_id: Uuid,
    pub service_id: Uuid,
    pub payer_id: String,
    pub payee_id: String,
    pub amount: i64,
    pub fee_amount: i64,
    pub currency: String,
    pub refunded_amount: i64,
    pub status: String,
    pub processor_customer_id: String,
    pub destination_account_id: String,
    pub method_kind: Option<String>,
    pub method_brand: Option<String>,
    pub method_last4: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = parse_payment_status(&row.status)?;

        let method_summary = row.method_kind.map(|kind| PaymentMethodSummary {
            kind,
            brand: row.method_brand,
            last4: row.method_last4,
        });

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            external_id: row.external_id,
            appointment_id: AppointmentId::from_uuid(row.appointment_id),
            service_id: ServiceId::from_uuid(row.service_id),
            payer_id: parse_user_id(&row.payer_id)?,
            payee_id: parse_user_id(&row.payee_id)?,
            amount: row.amount,
            fee_amount: row.fee_amount,
            currency: row.currency,
            refunded_amount: row.refunded_amount,
            status,
            processor_customer_id: row.processor_customer_id,
            destination_account_id: row.destination_account_id,
            method_summary,
            failure_reason: row.failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

pub(super) fn parse_payment_status(s: &str) -> Result<PaymentStatus, DomainError> {
    PaymentStatus::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment status value: {}", s),
        )
    })
}

pub(super) fn parse_user_id(s: &str) -> Result<UserId, DomainError> {
    UserId::new(s)
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid user id: {}", e)))
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl PaymentLedger for PostgresPaymentLedger {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, external_id, appointment_id, service_id, payer_id, payee_id,
                amount, fee_amount, currency, refunded_amount, status,
                processor_customer_id, destination_account_id,
                method_kind, method_brand, method_last4, failure_reason,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19
            )
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(&payment.external_id)
        .bind(payment.appointment_id.as_uuid())
        .bind(payment.service_id.as_uuid())
        .bind(payment.payer_id.as_str())
        .bind(payment.payee_id.as_str())
        .bind(payment.amount)
        .bind(payment.fee_amount)
        .bind(&payment.currency)
        .bind(payment.refunded_amount)
        .bind(payment.status.as_str())
        .bind(&payment.processor_customer_id)
        .bind(&payment.destination_account_id)
        .bind(payment.method_summary.as_ref().map(|m| m.kind.clone()))
        .bind(
            payment
                .method_summary
                .as_ref()
                .and_then(|m| m.brand.clone()),
        )
        .bind(
            payment
                .method_summary
                .as_ref()
                .and_then(|m| m.last4.clone()),
        )
        .bind(&payment.failure_reason)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payments_external_id_key") {
                    return DomainError::new(
                        ErrorCode::DuplicateExternalId,
                        "A payment with this transaction id already exists",
                    );
                }
            }
            db_error("Failed to insert payment", e)
        })?;

        Ok(())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE external_id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE appointment_id = $1 ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(appointment_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list payments for appointment", e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn apply_transition(
        &self,
        payment_id: PaymentId,
        transition: &PaymentTransition,
    ) -> Result<TransitionOutcome, DomainError> {
        let expected: Vec<&'static str> = transition
            .expected_sources
            .iter()
            .map(PaymentStatus::as_str)
            .collect();

        let row: Option<TransitionRow> = sqlx::query_as(&transition_statement())
            .bind(payment_id.as_uuid())
            .bind(transition.target.as_str())
            .bind(transition.refund_total)
            .bind(transition.method_summary.as_ref().map(|m| m.kind.clone()))
            .bind(
                transition
                    .method_summary
                    .as_ref()
                    .and_then(|m| m.brand.clone()),
            )
            .bind(
                transition
                    .method_summary
                    .as_ref()
                    .and_then(|m| m.last4.clone()),
            )
            .bind(&transition.failure_reason)
            .bind(&expected)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to apply payment transition", e))?;

        if let Some(row) = row {
            let previous_status = parse_payment_status(&row.previous_status)?;
            let payment = Payment::try_from(row.payment)?;
            return Ok(TransitionOutcome::Applied {
                payment,
                previous_status,
            });
        }

        // No row updated: either the payment does not exist or its status
        // was outside the expected source set. Distinguish the two.
        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM payments WHERE id = $1")
                .bind(payment_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to read payment status", e))?;

        match current {
            Some((status,)) => Ok(TransitionOutcome::Stale {
                current_status: parse_payment_status(&status)?,
            }),
            None => Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                "Payment not found",
            )),
        }
    }
}

/// Single-statement CAS. The refund total is clamped in SQL so the stored
/// amount never regresses and never exceeds the charge, even when two
/// refund events race. The `prior` CTE takes the row lock before reading
/// the pre-update status: under READ COMMITTED, a delivery that waited on
/// a concurrent writer reports the status that writer committed rather
/// than a stale snapshot, so first entry into a status is observed by
/// exactly one delivery.
fn transition_statement() -> String {
    format!(
        r#"
        WITH prior AS (
            SELECT id AS prior_id, status AS previous_status
            FROM payments
            WHERE id = $1
            FOR UPDATE
        )
        UPDATE payments SET
            status = $2,
            refunded_amount = CASE
                WHEN $3::bigint IS NOT NULL
                THEN LEAST(GREATEST($3::bigint, refunded_amount), amount)
                ELSE refunded_amount
            END,
            method_kind = COALESCE($4, method_kind),
            method_brand = COALESCE($5, method_brand),
            method_last4 = COALESCE($6, method_last4),
            failure_reason = COALESCE($7, failure_reason),
            updated_at = NOW()
        FROM prior
        WHERE payments.id = prior.prior_id AND payments.status = ANY($8)
        RETURNING {}, prior.previous_status
        "#,
        PAYMENT_COLUMNS
    )
}

/// Row returned by the CAS statement: the updated payment plus the status
/// it held before the write.
#[derive(Debug, sqlx::FromRow)]
struct TransitionRow {
    #[sqlx(flatten)]
    payment: PaymentRow,
    previous_status: String,
}
