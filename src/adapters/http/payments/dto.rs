//! HTTP DTOs (Data Transfer Objects) for payment endpoints.
//!
//! These types define the JSON request/response structure for the payment
//! API. They serve as the boundary between HTTP and the application layer.

use crate::application::handlers::payments::OnboardProviderResult;
use crate::domain::payment::{Payment, PaymentMethodSummary, PaymentStatus};
use crate::domain::provider::{AccountStatus, ProviderPayoutAccount};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a payment for an appointment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// The appointment being paid for.
    pub appointment_id: Uuid,
}

/// Request to start connected-account onboarding.
#[derive(Debug, Clone, Deserialize)]
pub struct OnboardProviderRequest {
    /// Provider's email for the processor account.
    pub email: String,
    /// Two-letter country code for the account.
    #[serde(default = "default_country")]
    pub country: String,
    /// URL the processor redirects to when the link expires.
    pub refresh_url: String,
    /// URL the processor redirects to after onboarding.
    pub return_url: String,
}

fn default_country() -> String {
    "US".to_string()
}

/// Query parameters for payment history.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPaymentsParams {
    /// "payer" (default) or "payee".
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Payment method summary for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodResponse {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
}

impl From<PaymentMethodSummary> for PaymentMethodResponse {
    fn from(summary: PaymentMethodSummary) -> Self {
        Self {
            kind: summary.kind,
            brand: summary.brand,
            last4: summary.last4,
        }
    }
}

/// A payment as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub appointment_id: String,
    /// Total charge in minor currency units.
    pub amount: i64,
    /// Platform fee in minor currency units.
    pub fee_amount: i64,
    pub currency: String,
    /// Cumulative refunded amount in minor currency units.
    pub refunded_amount: i64,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethodResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// When the payment was created (ISO 8601).
    pub created_at: String,
    /// Last reconciliation write (ISO 8601).
    pub updated_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            appointment_id: payment.appointment_id.to_string(),
            amount: payment.amount,
            fee_amount: payment.fee_amount,
            currency: payment.currency,
            refunded_amount: payment.refunded_amount,
            status: payment.status,
            method: payment.method_summary.map(PaymentMethodResponse::from),
            failure_reason: payment.failure_reason,
            created_at: payment.created_at.as_datetime().to_rfc3339(),
            updated_at: payment.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Response for payment intent creation.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentResponse {
    pub payment: PaymentResponse,
    /// Client secret the frontend passes to the processor's JS SDK.
    pub client_secret: String,
}

/// Response for payment history.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentResponse>,
}

/// Response for onboarding initiation.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingResponse {
    pub account_id: String,
    /// One-time URL the provider visits to complete onboarding.
    pub onboarding_url: String,
    /// When the link expires (Unix timestamp).
    pub expires_at: i64,
}

impl From<OnboardProviderResult> for OnboardingResponse {
    fn from(result: OnboardProviderResult) -> Self {
        Self {
            account_id: result.account_id,
            onboarding_url: result.onboarding_url,
            expires_at: result.expires_at,
        }
    }
}

/// Response for payout account status.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutAccountResponse {
    pub provider_id: String,
    pub external_account_id: String,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub status: AccountStatus,
    /// Whether the provider can currently be paid.
    pub payout_ready: bool,
}

impl From<ProviderPayoutAccount> for PayoutAccountResponse {
    fn from(account: ProviderPayoutAccount) -> Self {
        let payout_ready = account.payout_ready();
        Self {
            provider_id: account.provider_id.to_string(),
            external_account_id: account.external_account_id,
            charges_enabled: account.charges_enabled,
            payouts_enabled: account.payouts_enabled,
            status: account.status,
            payout_ready,
        }
    }
}

/// Standard error response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
