//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers. The webhook handler is the one route that reads the raw body:
//! signature verification runs over the exact bytes received.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::payments::{
    CreatePaymentIntentCommand, CreatePaymentIntentHandler, ListPaymentsHandler,
    ListPaymentsQuery, OnboardProviderCommand, OnboardProviderHandler, ReconcileOutcome,
    ReconcileWebhookCommand, ReconcileWebhookHandler, SyncAccountStatusCommand,
    SyncAccountStatusHandler,
};
use crate::domain::foundation::{AppointmentId, FeePercentage, UserId};
use crate::domain::payment::PaymentFlowError;
use crate::ports::{
    AppointmentDirectory, Notifier, PaymentLedger, PaymentReader, PaymentRole,
    ProcessorGateway, ProviderAccountStore, UserDirectory,
};

use super::dto::{
    CreatePaymentIntentRequest, ErrorResponse, ListPaymentsParams, OnboardProviderRequest,
    OnboardingResponse, PaymentIntentResponse, PaymentListResponse, PaymentResponse,
    PayoutAccountResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; dependencies are Arc-wrapped for cheap sharing.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub ledger: Arc<dyn PaymentLedger>,
    pub reader: Arc<dyn PaymentReader>,
    pub appointments: Arc<dyn AppointmentDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub accounts: Arc<dyn ProviderAccountStore>,
    pub gateway: Arc<dyn ProcessorGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub fee_percentage: FeePercentage,
}

impl PaymentsAppState {
    /// Create handlers on demand from the shared state.
    pub fn create_intent_handler(&self) -> CreatePaymentIntentHandler {
        CreatePaymentIntentHandler::new(
            self.appointments.clone(),
            self.users.clone(),
            self.accounts.clone(),
            self.ledger.clone(),
            self.gateway.clone(),
            self.fee_percentage,
        )
    }

    pub fn reconcile_handler(&self) -> ReconcileWebhookHandler {
        ReconcileWebhookHandler::new(
            self.gateway.clone(),
            self.ledger.clone(),
            self.appointments.clone(),
            self.accounts.clone(),
            self.notifier.clone(),
        )
    }

    pub fn onboard_handler(&self) -> OnboardProviderHandler {
        OnboardProviderHandler::new(self.gateway.clone(), self.accounts.clone())
    }

    pub fn sync_account_handler(&self) -> SyncAccountStatusHandler {
        SyncAccountStatusHandler::new(self.gateway.clone(), self.accounts.clone())
    }

    pub fn list_payments_handler(&self) -> ListPaymentsHandler {
        ListPaymentsHandler::new(self.reader.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context (would come from auth middleware in production)
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from request.
///
/// In production this is extracted from the platform's session by auth
/// middleware; for development an X-User-Id header is accepted.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| UserId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments/intents - Start a payment for an appointment
pub async fn create_payment_intent(
    State(state): State<PaymentsAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let handler = state.create_intent_handler();
    let cmd = CreatePaymentIntentCommand {
        appointment_id: AppointmentId::from_uuid(request.appointment_id),
        requested_by: user.user_id,
    };

    let result = handler.handle(cmd).await?;

    let response = PaymentIntentResponse {
        payment: PaymentResponse::from(result.payment),
        client_secret: result.client_secret,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/webhooks/stripe - Reconcile processor webhook events
///
/// No user authentication; the event is authenticated by its signature
/// over the raw request bytes. Any 2xx acknowledges the event; a 5xx asks
/// the processor to redeliver.
pub async fn handle_processor_webhook(
    State(state): State<PaymentsAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(PaymentApiError(PaymentFlowError::SignatureInvalid))?;

    let handler = state.reconcile_handler();
    let cmd = ReconcileWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    let outcome = handler.handle(cmd).await?;

    // Every non-error outcome acknowledges the event.
    let ack = match outcome {
        ReconcileOutcome::Applied { .. } => "applied",
        ReconcileOutcome::Duplicate { .. } => "duplicate",
        ReconcileOutcome::Discarded { .. } => "discarded",
        ReconcileOutcome::Unmatched { .. } => "unmatched",
        ReconcileOutcome::AccountSynced { .. } => "account_synced",
        ReconcileOutcome::AccountUnmatched { .. } => "account_unmatched",
        ReconcileOutcome::Ignored { .. } => "ignored",
    };

    Ok(Json(serde_json::json!({ "received": true, "outcome": ack })))
}

/// POST /api/providers/{provider_id}/payout-account - Start onboarding
pub async fn onboard_provider(
    State(state): State<PaymentsAppState>,
    user: AuthenticatedUser,
    Path(provider_id): Path<String>,
    Json(request): Json<OnboardProviderRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let provider_id = parse_provider_id(&provider_id)?;
    require_self(&user, &provider_id)?;

    let handler = state.onboard_handler();
    let cmd = OnboardProviderCommand {
        provider_id,
        email: request.email,
        country: request.country,
        refresh_url: request.refresh_url,
        return_url: request.return_url,
    };

    let result = handler.handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(OnboardingResponse::from(result))))
}

/// POST /api/providers/{provider_id}/payout-account/refresh - Pull current
/// capability state from the processor
pub async fn refresh_payout_account(
    State(state): State<PaymentsAppState>,
    user: AuthenticatedUser,
    Path(provider_id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let provider_id = parse_provider_id(&provider_id)?;
    require_self(&user, &provider_id)?;

    let handler = state.sync_account_handler();
    let cmd = SyncAccountStatusCommand { provider_id };

    let account = handler.handle(cmd).await?;

    Ok(Json(PayoutAccountResponse::from(account)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/payments - Payment history for the current user
pub async fn list_payments(
    State(state): State<PaymentsAppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListPaymentsParams>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let role = match params.role.as_deref() {
        None | Some("payer") => PaymentRole::Payer,
        Some("payee") => PaymentRole::Payee,
        Some(other) => {
            return Err(PaymentApiError(PaymentFlowError::validation(
                "role",
                format!("unknown role '{}', expected payer or payee", other),
            )))
        }
    };

    let handler = state.list_payments_handler();
    let query = ListPaymentsQuery {
        user_id: user.user_id,
        role,
        limit: params.limit,
        offset: params.offset,
    };

    let payments = handler.handle(query).await?;

    let response = PaymentListResponse {
        payments: payments.into_iter().map(PaymentResponse::from).collect(),
    };

    Ok(Json(response))
}

/// GET /api/providers/{provider_id}/payout-account - Stored payout account
pub async fn get_payout_account(
    State(state): State<PaymentsAppState>,
    user: AuthenticatedUser,
    Path(provider_id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let provider_id = parse_provider_id(&provider_id)?;
    require_self(&user, &provider_id)?;

    let account = state
        .accounts
        .find_by_provider(&provider_id)
        .await
        .map_err(PaymentFlowError::from)?
        .ok_or_else(|| {
            PaymentApiError(PaymentFlowError::invalid_state(
                "provider has no payout account",
            ))
        })?;

    Ok(Json(PayoutAccountResponse::from(account)))
}

fn parse_provider_id(raw: &str) -> Result<UserId, PaymentApiError> {
    UserId::new(raw).map_err(|_| {
        PaymentApiError(PaymentFlowError::validation(
            "provider_id",
            "provider id must not be empty",
        ))
    })
}

/// Providers manage only their own payout account.
fn require_self(user: &AuthenticatedUser, provider_id: &UserId) -> Result<(), PaymentApiError> {
    if &user.user_id != provider_id {
        return Err(PaymentApiError(PaymentFlowError::Forbidden));
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts payment flow errors to HTTP responses.
pub struct PaymentApiError(PaymentFlowError);

impl From<PaymentFlowError> for PaymentApiError {
    fn from(err: PaymentFlowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            PaymentFlowError::AppointmentNotFound(_) => StatusCode::NOT_FOUND,
            PaymentFlowError::Forbidden => StatusCode::FORBIDDEN,
            PaymentFlowError::AlreadyPaid | PaymentFlowError::PaymentInProgress => {
                StatusCode::CONFLICT
            }
            PaymentFlowError::PayeeNotReady => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentFlowError::InvalidState { .. } | PaymentFlowError::ValidationFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            PaymentFlowError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            PaymentFlowError::DependencyUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PaymentFlowError::InternalInvariant { .. } | PaymentFlowError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse::new(self.0.code().to_string(), self.0.message());
        (status, Json(body)).into_response()
    }
}
