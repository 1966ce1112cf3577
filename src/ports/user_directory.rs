//! User directory port.
//!
//! Lookup of contact details for charging and notifying, plus storage of
//! the payer's processor customer id so customers are created at most once.

use crate::domain::foundation::{DomainError, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Contact details the payment flow needs about a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContact {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,

    /// Processor customer id, set after first charge setup.
    pub processor_customer_id: Option<String>,
}

/// Port for user lookups and processor-customer-id persistence.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch a user's contact record.
    async fn find(&self, user_id: &UserId) -> Result<Option<UserContact>, DomainError>;

    /// Record the processor customer id for a user. Idempotent.
    async fn set_processor_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError>;
}
