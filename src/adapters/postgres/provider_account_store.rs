//! PostgreSQL implementation of ProviderAccountStore.
//!
//! One row per provider; webhook sync and on-demand refresh both write
//! through `upsert`.

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::provider::{AccountStatus, ProviderPayoutAccount};
use crate::ports::ProviderAccountStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// PostgreSQL implementation of the ProviderAccountStore port.
pub struct PostgresProviderAccountStore {
    pool: PgPool,
}

impl PostgresProviderAccountStore {
    /// Creates a new PostgresProviderAccountStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a provider payout account.
#[derive(Debug, sqlx::FromRow)]
struct PayoutAccountRow {
    provider_id: String,
    external_account_id: String,
    charges_enabled: bool,
    payouts_enabled: bool,
    status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PayoutAccountRow> for ProviderPayoutAccount {
    type Error = DomainError;

    fn try_from(row: PayoutAccountRow) -> Result<Self, Self::Error> {
        let status = AccountStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid account status value: {}", row.status),
            )
        })?;

        Ok(ProviderPayoutAccount {
            provider_id: UserId::new(row.provider_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid provider id: {}", e))
            })?,
            external_account_id: row.external_account_id,
            charges_enabled: row.charges_enabled,
            payouts_enabled: row.payouts_enabled,
            status,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl ProviderAccountStore for PostgresProviderAccountStore {
    async fn find_by_provider(
        &self,
        provider_id: &UserId,
    ) -> Result<Option<ProviderPayoutAccount>, DomainError> {
        let row: Option<PayoutAccountRow> = sqlx::query_as(
            r#"
            SELECT provider_id, external_account_id, charges_enabled,
                   payouts_enabled, status, updated_at
            FROM provider_payout_accounts
            WHERE provider_id = $1
            "#,
        )
        .bind(provider_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find payout account: {}", e),
            )
        })?;

        row.map(ProviderPayoutAccount::try_from).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_account_id: &str,
    ) -> Result<Option<ProviderPayoutAccount>, DomainError> {
        let row: Option<PayoutAccountRow> = sqlx::query_as(
            r#"
            SELECT provider_id, external_account_id, charges_enabled,
                   payouts_enabled, status, updated_at
            FROM provider_payout_accounts
            WHERE external_account_id = $1
            "#,
        )
        .bind(external_account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find payout account: {}", e),
            )
        })?;

        row.map(ProviderPayoutAccount::try_from).transpose()
    }

    async fn upsert(&self, account: &ProviderPayoutAccount) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO provider_payout_accounts (
                provider_id, external_account_id, charges_enabled,
                payouts_enabled, status, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (provider_id) DO UPDATE SET
                external_account_id = EXCLUDED.external_account_id,
                charges_enabled = EXCLUDED.charges_enabled,
                payouts_enabled = EXCLUDED.payouts_enabled,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(account.provider_id.as_str())
        .bind(&account.external_account_id)
        .bind(account.charges_enabled)
        .bind(account.payouts_enabled)
        .bind(account.status.as_str())
        .bind(account.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to upsert payout account: {}", e),
            )
        })?;

        Ok(())
    }
}
