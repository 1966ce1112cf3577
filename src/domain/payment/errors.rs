//! Payment flow error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | AppointmentNotFound | 404 |
//! | Forbidden | 403 |
//! | AlreadyPaid / PaymentInProgress | 409 |
//! | PayeeNotReady | 422 |
//! | InvalidState / ValidationFailed | 400 |
//! | SignatureInvalid | 401 |
//! | DependencyUnavailable | 503 |
//! | InternalInvariant / Internal | 500 |

use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode};

/// Errors surfaced by the payment handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentFlowError {
    /// Appointment does not exist.
    AppointmentNotFound(AppointmentId),

    /// Caller is not the appointment's payer.
    Forbidden,

    /// Appointment has no usable service price or is otherwise not payable.
    InvalidState { reason: String },

    /// Provider is not set up to receive payments.
    PayeeNotReady,

    /// A succeeded or refunded payment already exists for this appointment.
    AlreadyPaid,

    /// A non-terminal payment already exists for this appointment.
    PaymentInProgress,

    /// Misconfiguration produced a fee outside `[0, total)`; fail closed.
    InternalInvariant { detail: String },

    /// Webhook signature verification failed.
    SignatureInvalid,

    /// Caller-fixable input problem.
    ValidationFailed { field: String, message: String },

    /// Processor or ledger transiently unavailable; retryable.
    DependencyUnavailable { detail: String },

    /// Everything else. Detail stays in logs, never in responses.
    Internal(String),
}

impl PaymentFlowError {
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        PaymentFlowError::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn internal_invariant(detail: impl Into<String>) -> Self {
        PaymentFlowError::InternalInvariant {
            detail: detail.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentFlowError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        PaymentFlowError::DependencyUnavailable {
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        PaymentFlowError::Internal(detail.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentFlowError::AppointmentNotFound(_) => ErrorCode::AppointmentNotFound,
            PaymentFlowError::Forbidden => ErrorCode::Forbidden,
            PaymentFlowError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            PaymentFlowError::PayeeNotReady => ErrorCode::PayeeNotReady,
            PaymentFlowError::AlreadyPaid => ErrorCode::AlreadyPaid,
            PaymentFlowError::PaymentInProgress => ErrorCode::PaymentInProgress,
            PaymentFlowError::InternalInvariant { .. } => ErrorCode::InternalInvariant,
            PaymentFlowError::SignatureInvalid => ErrorCode::SignatureInvalid,
            PaymentFlowError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            PaymentFlowError::DependencyUnavailable { .. } => ErrorCode::DependencyUnavailable,
            PaymentFlowError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// User-facing message. Generic for internal failures; processor
    /// detail lives only in logs.
    pub fn message(&self) -> String {
        match self {
            PaymentFlowError::AppointmentNotFound(id) => {
                format!("Appointment not found: {}", id)
            }
            PaymentFlowError::Forbidden => {
                "You are not authorized to pay for this appointment".to_string()
            }
            PaymentFlowError::InvalidState { reason } => {
                format!("Appointment is not payable: {}", reason)
            }
            PaymentFlowError::PayeeNotReady => {
                "Provider is not set up to receive payments".to_string()
            }
            PaymentFlowError::AlreadyPaid => {
                "This appointment has already been paid".to_string()
            }
            PaymentFlowError::PaymentInProgress => {
                "A payment for this appointment is already in progress".to_string()
            }
            PaymentFlowError::InternalInvariant { .. }
            | PaymentFlowError::Internal(_) => "Failed to create payment intent".to_string(),
            PaymentFlowError::SignatureInvalid => "Invalid webhook signature".to_string(),
            PaymentFlowError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            PaymentFlowError::DependencyUnavailable { .. } => {
                "Payment service temporarily unavailable, please retry".to_string()
            }
        }
    }

    /// Returns true if the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentFlowError::DependencyUnavailable { .. })
    }
}

impl std::fmt::Display for PaymentFlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PaymentFlowError {}

impl From<DomainError> for PaymentFlowError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::AppointmentNotFound | ErrorCode::PaymentNotFound | ErrorCode::UserNotFound => {
                PaymentFlowError::Internal(err.to_string())
            }
            ErrorCode::AlreadyPaid => PaymentFlowError::AlreadyPaid,
            ErrorCode::PaymentInProgress | ErrorCode::DuplicateExternalId => {
                PaymentFlowError::PaymentInProgress
            }
            ErrorCode::Forbidden | ErrorCode::Unauthorized => PaymentFlowError::Forbidden,
            ErrorCode::PayeeNotReady => PaymentFlowError::PayeeNotReady,
            ErrorCode::SignatureInvalid => PaymentFlowError::SignatureInvalid,
            ErrorCode::InternalInvariant => PaymentFlowError::InternalInvariant {
                detail: err.to_string(),
            },
            ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::InvalidFormat
            | ErrorCode::OutOfRange => PaymentFlowError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::DependencyUnavailable | ErrorCode::DatabaseError => {
                PaymentFlowError::DependencyUnavailable {
                    detail: err.to_string(),
                }
            }
            _ => PaymentFlowError::Internal(err.to_string()),
        }
    }
}

impl From<PaymentFlowError> for DomainError {
    fn from(err: PaymentFlowError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
