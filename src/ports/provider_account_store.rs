//! Provider payout account store port.

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::provider::ProviderPayoutAccount;
use async_trait::async_trait;

/// Port for persisting connected-account records.
#[async_trait]
pub trait ProviderAccountStore: Send + Sync {
    /// Fetch the payout account for a provider.
    async fn find_by_provider(
        &self,
        provider_id: &UserId,
    ) -> Result<Option<ProviderPayoutAccount>, DomainError>;

    /// Fetch by the processor's account id. Used by webhook sync, where
    /// the event only carries the external id.
    async fn find_by_external_id(
        &self,
        external_account_id: &str,
    ) -> Result<Option<ProviderPayoutAccount>, DomainError>;

    /// Insert or replace the record for a provider.
    async fn upsert(&self, account: &ProviderPayoutAccount) -> Result<(), DomainError>;
}
