//! Stripe processor gateway adapter.
//!
//! Implements the `ProcessorGateway` port for Stripe integration, including:
//! - Destination-charge payment intents with platform fees
//! - Express connected accounts and onboarding links
//! - Webhook signature verification
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! Required environment variables:
//! - `ROAMVET__PAYMENT__STRIPE_API_KEY`: Stripe secret API key
//! - `ROAMVET__PAYMENT__STRIPE_WEBHOOK_SECRET`: Webhook signing secret (whsec_...)

mod gateway;
mod webhook_types;

pub use gateway::{StripeConfig, StripeGatewayAdapter};
pub use webhook_types::{SignatureHeader, SignatureParseError, StripeWebhookEvent};
