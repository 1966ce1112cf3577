//! Payment command handlers.
//!
//! - `CreatePaymentIntentHandler` - start a split payment for an appointment
//! - `ReconcileWebhookHandler` - apply verified processor events
//! - `SyncAccountStatusHandler` - on-demand payout account refresh
//! - `OnboardProviderHandler` - connected-account onboarding
//! - `ListPaymentsHandler` - payment history queries

mod create_payment_intent;
mod list_payments;
mod onboard_provider;
mod reconcile_webhook;
mod sync_account_status;

#[cfg(test)]
pub(crate) mod test_support;

pub use create_payment_intent::{
    CreatePaymentIntentCommand, CreatePaymentIntentHandler, CreatePaymentIntentResult,
};
pub use list_payments::{ListPaymentsHandler, ListPaymentsQuery};
pub use onboard_provider::{OnboardProviderCommand, OnboardProviderHandler, OnboardProviderResult};
pub use reconcile_webhook::{ReconcileOutcome, ReconcileWebhookCommand, ReconcileWebhookHandler};
pub use sync_account_status::{SyncAccountStatusCommand, SyncAccountStatusHandler};
