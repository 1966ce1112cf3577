//! HTTP adapter for the payment module.
//!
//! Exposes payment intents, the processor webhook endpoint, provider
//! payout-account management, and payment history.

mod dto;
mod handlers;
mod routes;

pub use handlers::{AuthenticatedUser, PaymentsAppState};
pub use routes::{payment_routes, payments_router, provider_routes, webhook_routes};
