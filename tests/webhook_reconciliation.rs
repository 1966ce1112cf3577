//! Integration tests for webhook reconciliation.
//!
//! These tests run the real Stripe gateway adapter (signature verification
//! over raw bytes, event parsing) against in-memory persistence, end to end
//! through the reconciliation handler:
//! 1. Signed payload arrives
//! 2. HMAC verification and event classification
//! 3. Compare-and-swap transition on the payment row
//! 4. Side effects (appointment mirror, notifications)

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::{Arc, Mutex};

use roamvet_payments::adapters::stripe::{StripeConfig, StripeGatewayAdapter};
use roamvet_payments::application::handlers::payments::{
    ReconcileOutcome, ReconcileWebhookCommand, ReconcileWebhookHandler,
};
use roamvet_payments::domain::foundation::{
    AppointmentId, DomainError, ErrorCode, PaymentId, ServiceId, Timestamp, UserId,
};
use roamvet_payments::domain::payment::{Payment, PaymentFlowError, PaymentStatus, PaymentTransition};
use roamvet_payments::domain::provider::{AccountStatus, ProviderPayoutAccount};
use roamvet_payments::ports::{
    AppointmentDirectory, AppointmentPaymentStatus, AppointmentSnapshot, Notification,
    NotificationKind, Notifier, PaymentLedger, ProviderAccountStore, TransitionOutcome,
};

const WEBHOOK_SECRET: &str = "whsec_integration_secret";

// =============================================================================
// Test Infrastructure
// =============================================================================

/// In-memory ledger with real CAS semantics.
struct TestLedger {
    payments: Mutex<Vec<Payment>>,
}

impl TestLedger {
    fn with_payment(payment: Payment) -> Self {
        Self {
            payments: Mutex::new(vec![payment]),
        }
    }

    fn stored(&self) -> Vec<Payment> {
        self.payments.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentLedger for TestLedger {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        self.payments.lock().unwrap().push(payment.clone());
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

struct TestAppointments {
    status_updates: Mutex<Vec<(AppointmentId, AppointmentPaymentStatus)>>,
}

impl TestAppointments {
    fn new() -> Self {
        Self {
            status_updates: Mutex::new(Vec::new()),
        }
    }

    fn updates(&self) -> Vec<(AppointmentId, AppointmentPaymentStatus)> {
        self.status_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppointmentDirectory for TestAppointments {
    async fn find(
        &self,
        _appointment_id: AppointmentId,
    ) -> Result<Option<AppointmentSnapshot>, DomainError> {
        Ok(None)
    }

    async fn update_payment_status(
        &self,
        appointment_id: AppointmentId,
        status: AppointmentPaymentStatus,
    ) -> Result<(), DomainError> {
        self.status_updates
            .lock()
            .unwrap()
            .push((appointment_id, status));
        Ok(())
    }
}

struct TestAccounts {
    accounts: Mutex<Vec<ProviderPayoutAccount>>,
}

impl TestAccounts {
    fn new() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
        }
    }

    fn with_account(account: ProviderPayoutAccount) -> Self {
        Self {
            accounts: Mutex::new(vec![account]),
        }
    }

    fn stored(&self) -> Vec<ProviderPayoutAccount> {
        self.accounts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAccountStore for TestAccounts {
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
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(existing) = accounts
            .iter_mut()
            .find(|a| a.provider_id == account.provider_id)
        {
            *existing = account.clone();
        } else {
            accounts.push(account.clone());
        }
        Ok(())
    }
}

struct TestNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl TestNotifier {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for TestNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn sign(payload: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let signed_payload = format!("{}.{}", timestamp, payload);
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(signed_payload.as_bytes());
    let sig: String = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("t={},v1={}", timestamp, sig)
}

fn event_payload(event_type: &str, object: &str) -> String {
    format!(
        r#"{{
            "id": "evt_int_1",
            "type": "{}",
            "created": 1704067200,
            "data": {{"object": {}}},
            "livemode": false,
            "pending_webhooks": 1
        }}"#,
        event_type, object
    )
}

fn payment(status: PaymentStatus) -> Payment {
    Payment {
        id: PaymentId::new(),
        external_id: "pi_int_1".to_string(),
        appointment_id: AppointmentId::new(),
        service_id: ServiceId::new(),
        payer_id: UserId::new("owner-1").unwrap(),
        payee_id: UserId::new("vet-1").unwrap(),
        amount: 10000,
        fee_amount: 1000,
        currency: "usd".to_string(),
        refunded_amount: 0,
        status,
        processor_customer_id: "cus_int".to_string(),
        destination_account_id: "acct_int".to_string(),
        method_summary: None,
        failure_reason: None,
        created_at: Timestamp::now(),
        updated_at: Timestamp::now(),
    }
}

struct Harness {
    ledger: Arc<TestLedger>,
    appointments: Arc<TestAppointments>,
    accounts: Arc<TestAccounts>,
    notifier: Arc<TestNotifier>,
    handler: ReconcileWebhookHandler,
}

fn harness(ledger: TestLedger, accounts: TestAccounts) -> Harness {
    let gateway = Arc::new(StripeGatewayAdapter::new(StripeConfig::new(
        "sk_test_integration",
        WEBHOOK_SECRET,
    )));
    let ledger = Arc::new(ledger);
    let appointments = Arc::new(TestAppointments::new());
    let accounts = Arc::new(accounts);
    let notifier = Arc::new(TestNotifier::new());

    let handler = ReconcileWebhookHandler::new(
        gateway,
        ledger.clone(),
        appointments.clone(),
        accounts.clone(),
        notifier.clone(),
    );

    Harness {
        ledger,
        appointments,
        accounts,
        notifier,
        handler,
    }
}

async fn deliver(h: &Harness, payload: &str) -> Result<ReconcileOutcome, PaymentFlowError> {
    h.handler
        .handle(ReconcileWebhookCommand {
            payload: payload.as_bytes().to_vec(),
            signature: sign(payload),
        })
        .await
}

// =============================================================================
// Payment lifecycle
// =============================================================================

#[tokio::test]
async fn succeeded_event_settles_payment_and_dispatches_side_effects() {
    let h = harness(
        TestLedger::with_payment(payment(PaymentStatus::Pending)),
        TestAccounts::new(),
    );

    let payload = event_payload(
        "payment_intent.succeeded",
        r#"{
            "id": "pi_int_1",
            "status": "succeeded",
            "amount": 10000,
            "currency": "usd",
            "charges": {"data": [{
                "id": "ch_1",
                "payment_intent": "pi_int_1",
                "payment_method_details": {"type": "card", "card": {"brand": "visa", "last4": "4242"}}
            }]}
        }"#,
    );

    let outcome = deliver(&h, &payload).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Applied { .. }));

    let stored = h.ledger.stored();
    assert_eq!(stored[0].status, PaymentStatus::Succeeded);
    assert_eq!(
        stored[0].method_summary.as_ref().unwrap().last4.as_deref(),
        Some("4242")
    );

    // Appointment mirrored to paid.
    let updates = h.appointments.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1, AppointmentPaymentStatus::Paid);

    // Both parties notified.
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|n| {
        n.recipient == UserId::new("vet-1").unwrap()
            && matches!(n.kind, NotificationKind::PaymentReceived { amount: 10000, .. })
    }));
    assert!(sent.iter().any(|n| {
        n.recipient == UserId::new("owner-1").unwrap()
            && matches!(n.kind, NotificationKind::PaymentSuccess { .. })
    }));
}

#[tokio::test]
async fn redelivered_event_is_acknowledged_without_side_effects() {
    let h = harness(
        TestLedger::with_payment(payment(PaymentStatus::Pending)),
        TestAccounts::new(),
    );

    let payload = event_payload(
        "payment_intent.succeeded",
        r#"{"id": "pi_int_1", "status": "succeeded", "amount": 10000, "currency": "usd"}"#,
    );

    let first = deliver(&h, &payload).await.unwrap();
    assert!(matches!(first, ReconcileOutcome::Applied { .. }));

    let second = deliver(&h, &payload).await.unwrap();
    assert!(matches!(second, ReconcileOutcome::Duplicate { .. }));

    // Side effects ran exactly once.
    assert_eq!(h.appointments.updates().len(), 1);
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn failed_event_records_reason_and_notifies_payer() {
    let h = harness(
        TestLedger::with_payment(payment(PaymentStatus::Processing)),
        TestAccounts::new(),
    );

    let payload = event_payload(
        "payment_intent.payment_failed",
        r#"{
            "id": "pi_int_1",
            "status": "requires_payment_method",
            "amount": 10000,
            "currency": "usd",
            "last_payment_error": {"code": "card_declined", "message": "Your card was declined."}
        }"#,
    );

    let outcome = deliver(&h, &payload).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Applied { .. }));

    let stored = h.ledger.stored();
    assert_eq!(stored[0].status, PaymentStatus::Failed);
    assert_eq!(
        stored[0].failure_reason.as_deref(),
        Some("Your card was declined.")
    );

    // Failure never touches the appointment; only the payer hears about it.
    assert!(h.appointments.updates().is_empty());
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(sent[0].kind, NotificationKind::PaymentFailed { .. }));
}

#[tokio::test]
async fn refund_before_success_asks_for_redelivery() {
    let h = harness(
        TestLedger::with_payment(payment(PaymentStatus::Processing)),
        TestAccounts::new(),
    );

    let payload = event_payload(
        "charge.refunded",
        r#"{"id": "ch_1", "payment_intent": "pi_int_1", "amount": 10000, "amount_refunded": 10000}"#,
    );

    let result = deliver(&h, &payload).await;
    assert!(result.is_err());

    // Payment untouched; redelivery will retry once success lands.
    assert_eq!(h.ledger.stored()[0].status, PaymentStatus::Processing);
}

#[tokio::test]
async fn partial_refunds_accumulate_and_mirror_once() {
    let h = harness(
        TestLedger::with_payment(payment(PaymentStatus::Succeeded)),
        TestAccounts::new(),
    );

    let first = event_payload(
        "charge.refunded",
        r#"{"id": "ch_1", "payment_intent": "pi_int_1", "amount": 10000, "amount_refunded": 4000}"#,
    );
    deliver(&h, &first).await.unwrap();

    let second = event_payload(
        "charge.refunded",
        r#"{"id": "ch_1", "payment_intent": "pi_int_1", "amount": 10000, "amount_refunded": 10000}"#,
    );
    deliver(&h, &second).await.unwrap();

    let stored = h.ledger.stored();
    assert_eq!(stored[0].status, PaymentStatus::Refunded);
    assert_eq!(stored[0].refunded_amount, 10000);

    // Appointment mirrored to refunded only on the first entry into
    // Refunded.
    let refund_mirrors: Vec<_> = h
        .appointments
        .updates()
        .into_iter()
        .filter(|(_, s)| *s == AppointmentPaymentStatus::Refunded)
        .collect();
    assert_eq!(refund_mirrors.len(), 1);

    // Both parties notified once, on the first refund.
    let refund_notices: Vec<_> = h
        .notifier
        .sent()
        .into_iter()
        .filter(|n| matches!(n.kind, NotificationKind::RefundIssued { .. }))
        .collect();
    assert_eq!(refund_notices.len(), 2);
    assert!(refund_notices
        .iter()
        .any(|n| n.recipient == UserId::new("owner-1").unwrap()));
    assert!(refund_notices
        .iter()
        .any(|n| n.recipient == UserId::new("vet-1").unwrap()));
}

#[tokio::test]
async fn event_for_unknown_transaction_is_acknowledged() {
    let h = harness(
        TestLedger::with_payment(payment(PaymentStatus::Pending)),
        TestAccounts::new(),
    );

    let payload = event_payload(
        "payment_intent.succeeded",
        r#"{"id": "pi_other", "status": "succeeded", "amount": 500, "currency": "usd"}"#,
    );

    let outcome = deliver(&h, &payload).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Unmatched { .. }));
    assert_eq!(h.ledger.stored()[0].status, PaymentStatus::Pending);
}

// =============================================================================
// Signature enforcement
// =============================================================================

#[tokio::test]
async fn tampered_payload_is_rejected_before_any_state_change() {
    let h = harness(
        TestLedger::with_payment(payment(PaymentStatus::Pending)),
        TestAccounts::new(),
    );

    let payload = event_payload(
        "payment_intent.succeeded",
        r#"{"id": "pi_int_1", "status": "succeeded", "amount": 10000, "currency": "usd"}"#,
    );
    let signature = sign(&payload);
    let tampered = payload.replace("10000", "1");

    let result = h
        .handler
        .handle(ReconcileWebhookCommand {
            payload: tampered.into_bytes(),
            signature,
        })
        .await;

    assert!(result.is_err());
    assert_eq!(h.ledger.stored()[0].status, PaymentStatus::Pending);
    assert!(h.notifier.sent().is_empty());
}

// =============================================================================
// Account synchronization
// =============================================================================

#[tokio::test]
async fn account_updated_event_syncs_stored_capabilities() {
    let account = ProviderPayoutAccount {
        provider_id: UserId::new("vet-1").unwrap(),
        external_account_id: "acct_int".to_string(),
        charges_enabled: false,
        payouts_enabled: false,
        status: AccountStatus::OnboardingIncomplete,
        updated_at: Timestamp::now(),
    };
    let h = harness(
        TestLedger::with_payment(payment(PaymentStatus::Pending)),
        TestAccounts::with_account(account),
    );

    let payload = event_payload(
        "account.updated",
        r#"{
            "id": "acct_int",
            "charges_enabled": true,
            "payouts_enabled": true,
            "requirements": {"past_due": [], "currently_due": []}
        }"#,
    );

    let outcome = deliver(&h, &payload).await.unwrap();
    assert!(matches!(
        outcome,
        ReconcileOutcome::AccountSynced {
            status: AccountStatus::Verified,
            ..
        }
    ));

    let stored = h.accounts.stored();
    assert!(stored[0].charges_enabled);
    assert!(stored[0].payouts_enabled);
    assert_eq!(stored[0].status, AccountStatus::Verified);
}

#[tokio::test]
async fn unknown_event_types_are_ignored() {
    let h = harness(
        TestLedger::with_payment(payment(PaymentStatus::Pending)),
        TestAccounts::new(),
    );

    let payload = event_payload("invoice.created", r#"{"id": "in_1"}"#);

    let outcome = deliver(&h, &payload).await.unwrap();
    assert!(matches!(
        outcome,
        ReconcileOutcome::Ignored { ref event_type } if event_type == "invoice.created"
    ));
}
