//! OnboardProviderHandler - Command handler for connected-account onboarding.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::payment::PaymentFlowError;
use crate::domain::provider::{AccountStatus, ProviderPayoutAccount};
use crate::ports::{CreateAccountRequest, ProcessorGateway, ProviderAccountStore};

/// Command to start or resume provider onboarding.
#[derive(Debug, Clone)]
pub struct OnboardProviderCommand {
    pub provider_id: UserId,
    pub email: String,
    pub country: String,
    pub refresh_url: String,
    pub return_url: String,
}

/// Result of onboarding initiation.
#[derive(Debug, Clone)]
pub struct OnboardProviderResult {
    pub account_id: String,

    /// One-time URL for the provider to complete onboarding.
    pub onboarding_url: String,

    /// When the link expires (Unix timestamp).
    pub expires_at: i64,
}

/// Handler for creating a connected account and its onboarding link.
///
/// Idempotent on the account: a provider who abandoned onboarding gets a
/// fresh link to the same account, never a second account.
pub struct OnboardProviderHandler {
    gateway: Arc<dyn ProcessorGateway>,
    accounts: Arc<dyn ProviderAccountStore>,
}

impl OnboardProviderHandler {
    pub fn new(gateway: Arc<dyn ProcessorGateway>, accounts: Arc<dyn ProviderAccountStore>) -> Self {
        Self { gateway, accounts }
    }

    pub async fn handle(
        &self,
        cmd: OnboardProviderCommand,
    ) -> Result<OnboardProviderResult, PaymentFlowError> {
        let account_id = match self.accounts.find_by_provider(&cmd.provider_id).await? {
            Some(existing) => existing.external_account_id,
            None => {
                let created = self
                    .gateway
                    .create_connected_account(CreateAccountRequest {
                        provider_id: cmd.provider_id.clone(),
                        email: cmd.email.clone(),
                        country: cmd.country.clone(),
                    })
                    .await
                    .map_err(map_gateway_error)?;

                let record = ProviderPayoutAccount {
                    provider_id: cmd.provider_id.clone(),
                    external_account_id: created.id.clone(),
                    charges_enabled: false,
                    payouts_enabled: false,
                    status: AccountStatus::OnboardingIncomplete,
                    updated_at: Timestamp::now(),
                };
                self.accounts.upsert(&record).await?;

                info!(
                    provider_id = %cmd.provider_id,
                    account_id = %created.id,
                    "connected account created"
                );
                created.id
            }
        };

        let link = self
            .gateway
            .create_onboarding_link(&account_id, &cmd.refresh_url, &cmd.return_url)
            .await
            .map_err(map_gateway_error)?;

        Ok(OnboardProviderResult {
            account_id,
            onboarding_url: link.url,
            expires_at: link.expires_at,
        })
    }
}

fn map_gateway_error(err: crate::ports::GatewayError) -> PaymentFlowError {
    if err.retryable {
        PaymentFlowError::unavailable(err.to_string())
    } else {
        PaymentFlowError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::payments::test_support::*;

    fn command() -> OnboardProviderCommand {
        OnboardProviderCommand {
            provider_id: provider_id(),
            email: "vet@example.com".to_string(),
            country: "US".to_string(),
            refresh_url: "https://app.example.com/onboarding/refresh".to_string(),
            return_url: "https://app.example.com/onboarding/done".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_account_and_link_for_new_provider() {
        let accounts = Arc::new(MockAccounts::new());
        let handler = OnboardProviderHandler::new(Arc::new(MockGateway::new()), accounts.clone());

        let result = handler.handle(command()).await.unwrap();

        assert!(result.account_id.starts_with("acct_"));
        assert!(result.onboarding_url.contains(&result.account_id));

        let stored = accounts.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, AccountStatus::OnboardingIncomplete);
        assert!(!stored[0].payout_ready());
    }

    #[tokio::test]
    async fn reuses_existing_account() {
        let existing = ProviderPayoutAccount {
            provider_id: provider_id(),
            external_account_id: "acct_existing".to_string(),
            charges_enabled: false,
            payouts_enabled: false,
            status: AccountStatus::OnboardingIncomplete,
            updated_at: Timestamp::now(),
        };
        let accounts = Arc::new(MockAccounts::with_account(existing));
        let handler = OnboardProviderHandler::new(Arc::new(MockGateway::new()), accounts.clone());

        let result = handler.handle(command()).await.unwrap();

        assert_eq!(result.account_id, "acct_existing");
        assert_eq!(accounts.stored().len(), 1);
    }
}
