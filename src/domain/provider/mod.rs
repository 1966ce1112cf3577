//! Provider payout account domain.

mod account;

pub use account::{AccountCapabilitySnapshot, AccountStatus, ProviderPayoutAccount};
