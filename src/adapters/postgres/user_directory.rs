//! PostgreSQL implementation of UserDirectory.
//!
//! Reads user contact details and persists the processor customer id so a
//! payer's customer record is created at most once.

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{UserContact, UserDirectory};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL implementation of the UserDirectory port.
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Creates a new PostgresUserDirectory with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    display_name: Option<String>,
    processor_customer_id: Option<String>,
}

impl TryFrom<UserRow> for UserContact {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserContact {
            id: UserId::new(row.id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user id: {}", e))
            })?,
            email: row.email,
            display_name: row.display_name,
            processor_customer_id: row.processor_customer_id,
        })
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserContact>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, display_name, processor_customer_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find user: {}", e))
        })?;

        row.map(UserContact::try_from).transpose()
    }

    async fn set_processor_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET processor_customer_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_str())
        .bind(customer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to set processor customer id: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::UserNotFound, "User not found"));
        }

        Ok(())
    }
}
