//! Appointment directory port.
//!
//! Payments hang off appointments owned by another part of the platform;
//! this port exposes the minimal view the payment flow needs plus the one
//! write-back it performs (the appointment's coarse payment status).

use crate::domain::foundation::{AppointmentId, DomainError, ServiceId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Coarse payment state mirrored onto the appointment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentPaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl AppointmentPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentPaymentStatus::Unpaid => "unpaid",
            AppointmentPaymentStatus::Paid => "paid",
            AppointmentPaymentStatus::Refunded => "refunded",
        }
    }
}

/// The slice of an appointment the payment flow reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSnapshot {
    pub id: AppointmentId,

    /// Pet owner who booked the appointment.
    pub owner_id: UserId,

    /// Provider delivering the service.
    pub provider_id: UserId,

    /// Service booked for this appointment.
    pub service_id: ServiceId,

    /// Service price in major currency units, as listed. `None` when the
    /// service has no price configured.
    pub service_price: Option<f64>,

    /// ISO currency code of the listed price, lowercase.
    pub currency: String,

    pub payment_status: AppointmentPaymentStatus,
}

/// Port for appointment lookups and payment-status write-back.
#[async_trait]
pub trait AppointmentDirectory: Send + Sync {
    /// Fetch an appointment with its service pricing.
    async fn find(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<AppointmentSnapshot>, DomainError>;

    /// Mirror a coarse payment status onto the appointment record.
    async fn update_payment_status(
        &self,
        appointment_id: AppointmentId,
        status: AppointmentPaymentStatus,
    ) -> Result<(), DomainError>;
}
