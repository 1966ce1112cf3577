//! Axum router configuration for payment endpoints.
//!
//! Defines the route structure for payment-related API endpoints and wires
//! them to their corresponding handlers.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_payment_intent, get_payout_account, handle_processor_webhook, list_payments,
    onboard_provider, refresh_payout_account, PaymentsAppState,
};

/// Create the payment API router.
///
/// # Routes
///
/// ## User Endpoints (require authentication)
/// - `POST /intents` - Start a payment for an appointment
/// - `GET /` - Payment history for the current user
pub fn payment_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/", get(list_payments))
        .route("/intents", post(create_payment_intent))
}

/// Create the provider payout-account router.
///
/// # Routes (require authentication; providers act on their own account)
/// - `POST /:provider_id/payout-account` - Start connected-account onboarding
/// - `GET /:provider_id/payout-account` - Stored payout account state
/// - `POST /:provider_id/payout-account/refresh` - Pull state from the processor
pub fn provider_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route(
            "/:provider_id/payout-account",
            post(onboard_provider).get(get_payout_account),
        )
        .route(
            "/:provider_id/payout-account/refresh",
            post(refresh_payout_account),
        )
}

/// Create the processor webhook router.
///
/// Separate from the user-facing routes because webhooks carry no user
/// authentication; they are verified via signature over the raw body.
///
/// # Routes
/// - `POST /stripe` - Reconcile processor webhook events
pub fn webhook_routes() -> Router<PaymentsAppState> {
    Router::new().route("/stripe", post(handle_processor_webhook))
}

/// Create the complete payment module router.
///
/// Combines payment, provider, and webhook routes into a single router
/// suitable for mounting at `/api`.
///
/// # Example
///
/// ```ignore
/// use axum::Router;
/// use crate::adapters::http::payments::{payments_router, PaymentsAppState};
///
/// let app_state = PaymentsAppState { /* ... */ };
/// let app = Router::new()
///     .nest("/api", payments_router())
///     .with_state(app_state);
/// ```
pub fn payments_router() -> Router<PaymentsAppState> {
    Router::new()
        .nest("/payments", payment_routes())
        .nest("/providers", provider_routes())
        .nest("/webhooks", webhook_routes())
}
