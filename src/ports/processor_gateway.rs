//! Processor gateway port for external payment processing.
//!
//! Defines the contract for payment processor integrations (e.g., Stripe).
//! Implementations handle intent creation with split-payment routing,
//! connected-account management, and webhook verification.
//!
//! # Design
//!
//! - **Processor agnostic**: Interface works with any destination-charge
//!   capable processor
//! - **Verified events only**: `verify_webhook` is the single entry point
//!   for webhook payloads; nothing downstream sees unverified bytes

use crate::domain::foundation::{AppointmentId, DomainError, PaymentId, ServiceId, UserId};
use crate::domain::payment::{GatewayEvent, PaymentStatus};
use crate::domain::provider::AccountCapabilitySnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment processor integrations.
#[async_trait]
pub trait ProcessorGateway: Send + Sync {
    /// Create a customer in the processor for a payer.
    ///
    /// Returns the processor's customer ID for future charges.
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<ProcessorCustomer, GatewayError>;

    /// Create a payment intent routed to a connected account.
    ///
    /// The platform fee is withheld from the destination transfer.
    async fn create_payment_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<IntentHandle, GatewayError>;

    /// Cancel a payment intent that has not yet been captured.
    async fn cancel_payment_intent(&self, external_id: &str) -> Result<(), GatewayError>;

    /// Verify a webhook signature and parse the event.
    ///
    /// `payload` must be the raw request body bytes as received; any
    /// re-serialization breaks the signature. Returns the classified
    /// event if valid, error if the signature or timestamp is bad.
    fn verify_webhook(&self, payload: &[u8], signature: &str)
        -> Result<GatewayEvent, GatewayError>;

    /// Create an express connected account for a provider.
    async fn create_connected_account(
        &self,
        request: CreateAccountRequest,
    ) -> Result<ConnectedAccount, GatewayError>;

    /// Create a one-time onboarding link for a connected account.
    async fn create_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<OnboardingLink, GatewayError>;

    /// Fetch the current capability state of a connected account.
    async fn retrieve_account(
        &self,
        account_id: &str,
    ) -> Result<AccountCapabilitySnapshot, GatewayError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// Internal user ID (stored as metadata).
    pub user_id: UserId,

    /// Customer email address.
    pub email: String,

    /// Customer name (optional).
    pub name: Option<String>,
}

/// Customer in the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorCustomer {
    /// Processor's customer ID (cus_...).
    pub id: String,

    /// Customer email.
    pub email: String,
}

/// Request to create a payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntentRequest {
    /// Total charge in minor currency units.
    pub amount: i64,

    /// ISO currency code, lowercase.
    pub currency: String,

    /// Processor customer ID of the payer.
    pub customer_id: String,

    /// Platform fee withheld from the transfer, minor units.
    pub application_fee: i64,

    /// Connected account receiving the transfer.
    pub destination_account_id: String,

    /// Internal correlation ids, attached as metadata so a processor
    /// dashboard entry can be traced back to the booking it charged for.
    pub payment_id: PaymentId,
    pub appointment_id: AppointmentId,
    pub service_id: ServiceId,
    pub payer_id: UserId,
    pub payee_id: UserId,
}

/// Handle to a created payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentHandle {
    /// Processor transaction ID (pi_...).
    pub external_id: String,

    /// Client secret the frontend uses to confirm the payment.
    pub client_secret: String,

    /// Initial status as reported by the processor.
    pub status: PaymentStatus,
}

/// Request to create a connected account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    /// Internal provider ID (stored as metadata).
    pub provider_id: UserId,

    /// Provider email address.
    pub email: String,

    /// Two-letter country code.
    pub country: String,
}

/// A newly created connected account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedAccount {
    /// Processor's account ID (acct_...).
    pub id: String,
}

/// One-time onboarding link for account setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingLink {
    /// URL for the provider to complete onboarding.
    pub url: String,

    /// When the link expires (Unix timestamp).
    pub expires_at: i64,
}

/// Errors from processor gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message. Logged, never shown to end users.
    pub message: String,

    /// Processor's own error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    /// Create a new gateway error.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Attach the processor's own error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Network or processor-side transient failure.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Unavailable, message)
    }

    /// Destination account cannot receive this charge.
    pub fn invalid_destination(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidDestination, message)
    }

    /// The processor rejected the request parameters.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidRequest, message)
    }

    /// Webhook signature or timestamp verification failed.
    pub fn signature_invalid(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::SignatureInvalid, message)
    }

    /// Referenced processor object does not exist.
    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        use crate::domain::foundation::ErrorCode;

        let code = match err.code {
            GatewayErrorCode::SignatureInvalid => ErrorCode::SignatureInvalid,
            GatewayErrorCode::Unavailable => ErrorCode::DependencyUnavailable,
            _ => ErrorCode::ProcessorError,
        };

        DomainError::new(code, err.message)
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Destination account cannot receive charges.
    InvalidDestination,

    /// Processor rejected the request parameters.
    InvalidRequest,

    /// Network failure, timeout, or processor 5xx/429.
    Unavailable,

    /// Webhook signature verification failed.
    SignatureInvalid,

    /// Referenced processor object does not exist.
    NotFound,

    /// Unknown error.
    Unknown,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayErrorCode::Unavailable)
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::InvalidDestination => "invalid_destination",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::Unavailable => "unavailable",
            GatewayErrorCode::SignatureInvalid => "signature_invalid",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
