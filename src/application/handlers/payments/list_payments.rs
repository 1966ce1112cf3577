//! ListPaymentsHandler - Query handler for a user's payment history.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::payment::{Payment, PaymentFlowError};
use crate::ports::{PaymentReader, PaymentRole};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Query for a user's payments on one side of the marketplace.
#[derive(Debug, Clone)]
pub struct ListPaymentsQuery {
    pub user_id: UserId,
    pub role: PaymentRole,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Handler for payment history queries.
pub struct ListPaymentsHandler {
    reader: Arc<dyn PaymentReader>,
}

impl ListPaymentsHandler {
    pub fn new(reader: Arc<dyn PaymentReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(&self, query: ListPaymentsQuery) -> Result<Vec<Payment>, PaymentFlowError> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = query.offset.unwrap_or(0).max(0);

        let payments = self
            .reader
            .list_for_user(&query.user_id, query.role, limit, offset)
            .await?;
        Ok(payments)
    }
}
