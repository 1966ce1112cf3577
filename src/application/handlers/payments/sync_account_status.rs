//! SyncAccountStatusHandler - Command handler for on-demand account refresh.
//!
//! Webhooks keep connected-account state current in the normal case; this
//! handler serves the explicit refresh a provider triggers after finishing
//! onboarding, pulling the live capability state from the processor.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::payment::PaymentFlowError;
use crate::domain::provider::ProviderPayoutAccount;
use crate::ports::{ProcessorGateway, ProviderAccountStore};

/// Command to refresh a provider's payout account from the processor.
#[derive(Debug, Clone)]
pub struct SyncAccountStatusCommand {
    pub provider_id: UserId,
}

/// Handler for refreshing connected-account capability state.
pub struct SyncAccountStatusHandler {
    gateway: Arc<dyn ProcessorGateway>,
    accounts: Arc<dyn ProviderAccountStore>,
}

impl SyncAccountStatusHandler {
    pub fn new(gateway: Arc<dyn ProcessorGateway>, accounts: Arc<dyn ProviderAccountStore>) -> Self {
        Self { gateway, accounts }
    }

    pub async fn handle(
        &self,
        cmd: SyncAccountStatusCommand,
    ) -> Result<ProviderPayoutAccount, PaymentFlowError> {
        let mut account = self
            .accounts
            .find_by_provider(&cmd.provider_id)
            .await?
            .ok_or_else(|| {
                PaymentFlowError::invalid_state("provider has no payout account to refresh")
            })?;

        let snapshot = self
            .gateway
            .retrieve_account(&account.external_account_id)
            .await
            .map_err(|err| {
                if err.retryable {
                    PaymentFlowError::unavailable(err.to_string())
                } else {
                    PaymentFlowError::internal(err.to_string())
                }
            })?;

        let status = snapshot.derive_status();
        if account.charges_enabled == snapshot.charges_enabled
            && account.payouts_enabled == snapshot.payouts_enabled
            && account.status == status
        {
            info!(
                provider_id = %account.provider_id,
                account_id = %account.external_account_id,
                status = status.as_str(),
                "payout account unchanged, skipping write"
            );
            return Ok(account);
        }

        account.charges_enabled = snapshot.charges_enabled;
        account.payouts_enabled = snapshot.payouts_enabled;
        account.status = status;
        account.updated_at = Timestamp::now();
        self.accounts.upsert(&account).await?;

        info!(
            provider_id = %account.provider_id,
            account_id = %account.external_account_id,
            status = account.status.as_str(),
            "payout account refreshed"
        );

        Ok(account)
    }
}
