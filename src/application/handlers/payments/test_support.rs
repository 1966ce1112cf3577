//! In-memory fakes shared by the payment handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{
    AppointmentId, DomainError, ErrorCode, PaymentId, ServiceId, Timestamp, UserId,
};
use crate::domain::payment::{Payment, PaymentStatus, PaymentTransition};
use crate::domain::provider::{AccountCapabilitySnapshot, ProviderPayoutAccount};
use crate::ports::{
    AppointmentDirectory, AppointmentPaymentStatus, AppointmentSnapshot, ConnectedAccount,
    CreateAccountRequest, CreateCustomerRequest, CreateIntentRequest, GatewayError, IntentHandle,
    Notification, Notifier, OnboardingLink, PaymentLedger, PaymentReader, PaymentRole,
    ProcessorCustomer, ProcessorGateway, ProviderAccountStore, TransitionOutcome, UserContact,
    UserDirectory,
};

pub fn owner_id() -> UserId {
    UserId::new("owner-1").unwrap()
}

pub fn provider_id() -> UserId {
    UserId::new("vet-1").unwrap()
}

pub fn test_payment(appointment_id: AppointmentId, status: PaymentStatus) -> Payment {
    Payment {
        id: PaymentId::new(),
        external_id: format!("pi_{}", uuid::Uuid::new_v4().simple()),
        appointment_id,
        service_id: ServiceId::new(),
        payer_id: owner_id(),
        payee_id: provider_id(),
        amount: 10000,
        fee_amount: 1000,
        currency: "usd".to_string(),
        refunded_amount: 0,
        status,
        processor_customer_id: "cus_test".to_string(),
        destination_account_id: "acct_test".to_string(),
        method_summary: None,
        failure_reason: None,
        created_at: Timestamp::now(),
        updated_at: Timestamp::now(),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Ledger
// ════════════════════════════════════════════════════════════════════════════

/// In-memory ledger with a real CAS on `apply_transition`.
pub struct InMemoryLedger {
    pub payments: Mutex<Vec<Payment>>,
    pub fail_insert: Mutex<Option<ErrorCode>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            payments: Mutex::new(Vec::new()),
            fail_insert: Mutex::new(None),
        }
    }

    pub fn with_payment(payment: Payment) -> Self {
        let ledger = Self::new();
        ledger.payments.lock().unwrap().push(payment);
        ledger
    }

    pub fn failing_insert(code: ErrorCode) -> Self {
        let ledger = Self::new();
        *ledger.fail_insert.lock().unwrap() = Some(code);
        ledger
    }

    pub fn stored(&self) -> Vec<Payment> {
        self.payments.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentLedger for InMemoryLedger {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        if let Some(code) = *self.fail_insert.lock().unwrap() {
            return Err(DomainError::new(code, "simulated insert failure"));
        }
        let mut payments = self.payments.lock().unwrap();
        if payments.iter().any(|p| p.external_id == payment.external_id) {
            return Err(DomainError::new(
                ErrorCode::DuplicateExternalId,
                "duplicate external id",
            ));
        }
        payments.push(payment.clone());
        Ok(())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.external_id == external_id)
            .cloned())
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_by_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Vec<Payment>, DomainError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.appointment_id == appointment_id)
            .cloned()
            .collect())
    }

    async fn apply_transition(
        &self,
        payment_id: PaymentId,
        transition: &PaymentTransition,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut payments = self.payments.lock().unwrap();
        let payment = payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .ok_or_else(|| DomainError::new(ErrorCode::PaymentNotFound, "payment not found"))?;

        if !transition.expected_sources.contains(&payment.status) {
            return Ok(TransitionOutcome::Stale {
                current_status: payment.status,
            });
        }

        let previous_status = payment.status;
        payment.status = transition.target;
        if let Some(total) = transition.refund_total {
            payment.refunded_amount = payment.clamp_refund_total(total);
        }
        if let Some(summary) = &transition.method_summary {
            payment.method_summary = Some(summary.clone());
        }
        if let Some(reason) = &transition.failure_reason {
            payment.failure_reason = Some(reason.clone());
        }
        payment.updated_at = Timestamp::now();

        Ok(TransitionOutcome::Applied {
            payment: payment.clone(),
            previous_status,
        })
    }
}

#[async_trait]
impl PaymentReader for InMemoryLedger {
    async fn list_for_user(
        &self,
        user_id: &UserId,
        role: PaymentRole,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Payment>, DomainError> {
        let payments = self.payments.lock().unwrap();
        Ok(payments
            .iter()
            .filter(|p| match role {
                PaymentRole::Payer => &p.payer_id == user_id,
                PaymentRole::Payee => &p.payee_id == user_id,
            })
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Gateway
// ════════════════════════════════════════════════════════════════════════════

pub struct MockGateway {
    pub fail_create_customer: bool,
    pub fail_create_intent: bool,
    pub intent_status: PaymentStatus,
    pub intent_requests: Mutex<Vec<CreateIntentRequest>>,
    pub canceled_intents: Mutex<Vec<String>>,
    pub account_snapshot: Mutex<Option<AccountCapabilitySnapshot>>,
    pub webhook_event: Mutex<Option<crate::domain::payment::GatewayEvent>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            fail_create_customer: false,
            fail_create_intent: false,
            intent_status: PaymentStatus::RequiresAction,
            intent_requests: Mutex::new(Vec::new()),
            canceled_intents: Mutex::new(Vec::new()),
            account_snapshot: Mutex::new(None),
            webhook_event: Mutex::new(None),
        }
    }

    pub fn delivering(event: crate::domain::payment::GatewayEvent) -> Self {
        let gateway = Self::new();
        *gateway.webhook_event.lock().unwrap() = Some(event);
        gateway
    }

    pub fn failing_intent() -> Self {
        Self {
            fail_create_intent: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl ProcessorGateway for MockGateway {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<ProcessorCustomer, GatewayError> {
        if self.fail_create_customer {
            return Err(GatewayError::unavailable("customer creation failed"));
        }
        Ok(ProcessorCustomer {
            id: format!("cus_{}", request.user_id),
            email: request.email,
        })
    }

    async fn create_payment_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<IntentHandle, GatewayError> {
        if self.fail_create_intent {
            return Err(GatewayError::unavailable("intent creation failed"));
        }
        let handle = IntentHandle {
            external_id: format!("pi_{}", request.payment_id),
            client_secret: "pi_secret_test".to_string(),
            status: self.intent_status,
        };
        self.intent_requests.lock().unwrap().push(request);
        Ok(handle)
    }

    async fn cancel_payment_intent(&self, external_id: &str) -> Result<(), GatewayError> {
        self.canceled_intents
            .lock()
            .unwrap()
            .push(external_id.to_string());
        Ok(())
    }

    fn verify_webhook(
        &self,
        _payload: &[u8],
        _signature: &str,
    ) -> Result<crate::domain::payment::GatewayEvent, GatewayError> {
        self.webhook_event
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| GatewayError::signature_invalid("bad signature"))
    }

    async fn create_connected_account(
        &self,
        request: CreateAccountRequest,
    ) -> Result<ConnectedAccount, GatewayError> {
        Ok(ConnectedAccount {
            id: format!("acct_{}", request.provider_id),
        })
    }

    async fn create_onboarding_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        _return_url: &str,
    ) -> Result<OnboardingLink, GatewayError> {
        Ok(OnboardingLink {
            url: format!("https://connect.stripe.com/setup/{}", account_id),
            expires_at: 1_900_000_000,
        })
    }

    async fn retrieve_account(
        &self,
        _account_id: &str,
    ) -> Result<AccountCapabilitySnapshot, GatewayError> {
        self.account_snapshot
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| GatewayError::not_found("account"))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Directories and stores
// ════════════════════════════════════════════════════════════════════════════

pub struct MockAppointments {
    pub snapshot: Mutex<Option<AppointmentSnapshot>>,
    pub status_updates: Mutex<Vec<(AppointmentId, AppointmentPaymentStatus)>>,
    pub fail_status_update: bool,
}

impl MockAppointments {
    pub fn new(snapshot: AppointmentSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            status_updates: Mutex::new(Vec::new()),
            fail_status_update: false,
        }
    }

    pub fn empty() -> Self {
        Self {
            snapshot: Mutex::new(None),
            status_updates: Mutex::new(Vec::new()),
            fail_status_update: false,
        }
    }

    pub fn updates(&self) -> Vec<(AppointmentId, AppointmentPaymentStatus)> {
        self.status_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppointmentDirectory for MockAppointments {
    async fn find(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<AppointmentSnapshot>, DomainError> {
        Ok(self
            .snapshot
            .lock()
            .unwrap()
            .clone()
            .filter(|s| s.id == appointment_id))
    }

    async fn update_payment_status(
        &self,
        appointment_id: AppointmentId,
        status: AppointmentPaymentStatus,
    ) -> Result<(), DomainError> {
        if self.fail_status_update {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "simulated update failure",
            ));
        }
        self.status_updates
            .lock()
            .unwrap()
            .push((appointment_id, status));
        Ok(())
    }
}

pub struct MockUsers {
    pub contacts: Mutex<HashMap<String, UserContact>>,
    pub stored_customer_ids: Mutex<Vec<(UserId, String)>>,
}

impl MockUsers {
    pub fn new() -> Self {
        Self {
            contacts: Mutex::new(HashMap::new()),
            stored_customer_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn with_contact(contact: UserContact) -> Self {
        let users = Self::new();
        users
            .contacts
            .lock()
            .unwrap()
            .insert(contact.id.to_string(), contact);
        users
    }
}

#[async_trait]
impl UserDirectory for MockUsers {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserContact>, DomainError> {
        Ok(self.contacts.lock().unwrap().get(&user_id.to_string()).cloned())
    }

    async fn set_processor_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        self.stored_customer_ids
            .lock()
            .unwrap()
            .push((user_id.clone(), customer_id.to_string()));
        Ok(())
    }
}

pub struct MockAccounts {
    pub accounts: Mutex<Vec<ProviderPayoutAccount>>,
    pub upsert_count: Mutex<u32>,
}

impl MockAccounts {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            upsert_count: Mutex::new(0),
        }
    }

    pub fn with_account(account: ProviderPayoutAccount) -> Self {
        let store = Self::new();
        store.accounts.lock().unwrap().push(account);
        store
    }

    pub fn stored(&self) -> Vec<ProviderPayoutAccount> {
        self.accounts.lock().unwrap().clone()
    }

    pub fn upserts(&self) -> u32 {
        *self.upsert_count.lock().unwrap()
    }
}

#[async_trait]
impl ProviderAccountStore for MockAccounts {
    async fn find_by_provider(
        &self,
        provider_id: &UserId,
    ) -> Result<Option<ProviderPayoutAccount>, DomainError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| &a.provider_id == provider_id)
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        external_account_id: &str,
    ) -> Result<Option<ProviderPayoutAccount>, DomainError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.external_account_id == external_account_id)
            .cloned())
    }

    async fn upsert(&self, account: &ProviderPayoutAccount) -> Result<(), DomainError> {
        *self.upsert_count.lock().unwrap() += 1;
        let mut accounts = self.accounts.lock().unwrap();
        accounts.retain(|a| a.provider_id != account.provider_id);
        accounts.push(account.clone());
        Ok(())
    }
}

pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}
