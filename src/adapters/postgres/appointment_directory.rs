//! PostgreSQL implementation of AppointmentDirectory.
//!
//! Appointments and services are owned by the scheduling side of the
//! platform; this adapter reads the slice the payment flow needs and
//! writes back only the coarse payment status.

use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, ServiceId, UserId};
use crate::ports::{AppointmentDirectory, AppointmentPaymentStatus, AppointmentSnapshot};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the AppointmentDirectory port.
pub struct PostgresAppointmentDirectory {
    pool: PgPool,
}

impl PostgresAppointmentDirectory {
    /// Creates a new PostgresAppointmentDirectory with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appointment joined with its service pricing.
#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    owner_id: String,
    provider_id: String,
    service_id: Uuid,
    service_price: Option<f64>,
    currency: String,
    payment_status: String,
}

impl TryFrom<AppointmentRow> for AppointmentSnapshot {
    type Error = DomainError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(AppointmentSnapshot {
            id: AppointmentId::from_uuid(row.id),
            owner_id: parse_user_id(&row.owner_id)?,
            provider_id: parse_user_id(&row.provider_id)?,
            service_id: ServiceId::from_uuid(row.service_id),
            service_price: row.service_price,
            currency: row.currency,
            payment_status: parse_payment_status(&row.payment_status)?,
        })
    }
}

fn parse_user_id(s: &str) -> Result<UserId, DomainError> {
    UserId::new(s)
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Invalid user id: {}", e)))
}

fn parse_payment_status(s: &str) -> Result<AppointmentPaymentStatus, DomainError> {
    match s {
        "unpaid" => Ok(AppointmentPaymentStatus::Unpaid),
        "paid" => Ok(AppointmentPaymentStatus::Paid),
        "refunded" => Ok(AppointmentPaymentStatus::Refunded),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid appointment payment status: {}", s),
        )),
    }
}

#[async_trait]
impl AppointmentDirectory for PostgresAppointmentDirectory {
    async fn find(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<AppointmentSnapshot>, DomainError> {
        let row: Option<AppointmentRow> = sqlx::query_as(
            r#"
            SELECT a.id, a.owner_id, a.provider_id, a.service_id,
                   s.price AS service_price, s.currency, a.payment_status
            FROM appointments a
            JOIN services s ON s.id = a.service_id
            WHERE a.id = $1
            "#,
        )
        .bind(appointment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find appointment: {}", e),
            )
        })?;

        row.map(AppointmentSnapshot::try_from).transpose()
    }

    async fn update_payment_status(
        &self,
        appointment_id: AppointmentId,
        status: AppointmentPaymentStatus,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE appointments SET payment_status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(appointment_id.as_uuid())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update appointment payment status: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::AppointmentNotFound,
                "Appointment not found",
            ));
        }

        Ok(())
    }
}
