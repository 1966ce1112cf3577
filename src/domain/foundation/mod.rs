//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the RoamVet payments domain.

mod errors;
mod ids;
mod money;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AppointmentId, PaymentId, ServiceId, UserId};
pub use money::{platform_fee, to_minor_units, FeePercentage};
pub use timestamp::Timestamp;
