//! ReconcileWebhookHandler - Command handler for processor webhook events.
//!
//! The webhook stream is the single source of truth for payment settlement.
//! Delivery is at-least-once and unordered, so every step here must be
//! idempotent: state moves only through the ledger's compare-and-swap, and
//! side effects fire only when a swap actually applied.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::foundation::UserId;
use crate::domain::payment::{
    classify_stale, transition_for, GatewayEventKind, Payment, PaymentFlowError, PaymentStatus,
    PaymentTransition, StaleKind,
};
use crate::domain::foundation::Timestamp;
use crate::domain::provider::{AccountCapabilitySnapshot, AccountStatus};
use crate::ports::{
    AppointmentDirectory, AppointmentPaymentStatus, Notification, NotificationKind, Notifier,
    PaymentLedger, ProcessorGateway, ProviderAccountStore,
};

/// Command carrying a raw webhook delivery.
///
/// `payload` must be the body bytes exactly as received; signature
/// verification fails on any re-serialization.
#[derive(Debug, Clone)]
pub struct ReconcileWebhookCommand {
    pub payload: Vec<u8>,
    pub signature: String,
}

/// What reconciliation did with the event. Every variant except an `Err`
/// is acknowledged to the processor with a 2xx.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The transition applied and side effects were dispatched.
    Applied {
        external_id: String,
        status: PaymentStatus,
    },

    /// Redelivery of an already-applied event; no-op.
    Duplicate { external_id: String },

    /// Out-of-order event that can never apply (e.g. success after
    /// failure). Logged for audit and discarded.
    Discarded {
        external_id: String,
        current_status: PaymentStatus,
    },

    /// Event references a transaction we never recorded.
    Unmatched { external_id: String },

    /// Connected-account state was synchronized.
    AccountSynced {
        provider_id: UserId,
        status: AccountStatus,
    },

    /// Account event for an account we do not track.
    AccountUnmatched { account_id: String },

    /// Event type outside our closed set; acknowledged and ignored.
    Ignored { event_type: String },
}

/// Handler for verified webhook reconciliation.
pub struct ReconcileWebhookHandler {
    gateway: Arc<dyn ProcessorGateway>,
    ledger: Arc<dyn PaymentLedger>,
    appointments: Arc<dyn AppointmentDirectory>,
    accounts: Arc<dyn ProviderAccountStore>,
    notifier: Arc<dyn Notifier>,
}

impl ReconcileWebhookHandler {
    pub fn new(
        gateway: Arc<dyn ProcessorGateway>,
        ledger: Arc<dyn PaymentLedger>,
        appointments: Arc<dyn AppointmentDirectory>,
        accounts: Arc<dyn ProviderAccountStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateway,
            ledger,
            appointments,
            accounts,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcileWebhookCommand,
    ) -> Result<ReconcileOutcome, PaymentFlowError> {
        // Verification happens on the raw bytes, before any parsing.
        let event = self
            .gateway
            .verify_webhook(&cmd.payload, &cmd.signature)
            .map_err(|err| {
                warn!(error = %err, "webhook signature verification failed");
                PaymentFlowError::SignatureInvalid
            })?;

        info!(event_id = %event.id, "processing webhook event");

        match event.kind {
            GatewayEventKind::AccountUpdated {
                account_id,
                snapshot,
            } => self.sync_account(&account_id, snapshot).await,
            GatewayEventKind::Unknown { event_type } => {
                Ok(ReconcileOutcome::Ignored { event_type })
            }
            kind => self.reconcile_payment(&event.id, kind).await,
        }
    }

    async fn reconcile_payment(
        &self,
        event_id: &str,
        kind: GatewayEventKind,
    ) -> Result<ReconcileOutcome, PaymentFlowError> {
        // Payment kinds always have a transition and an external id.
        let transition = transition_for(&kind)
            .ok_or_else(|| PaymentFlowError::internal("payment event without transition"))?;
        let external_id = kind
            .external_id()
            .ok_or_else(|| PaymentFlowError::internal("payment event without external id"))?
            .to_string();

        let payment = match self.ledger.find_by_external_id(&external_id).await? {
            Some(payment) => payment,
            None => {
                warn!(
                    event_id,
                    external_id, "webhook references unknown transaction; acknowledging"
                );
                return Ok(ReconcileOutcome::Unmatched { external_id });
            }
        };

        match self.ledger.apply_transition(payment.id, &transition).await? {
            crate::ports::TransitionOutcome::Applied {
                payment,
                previous_status,
            } => {
                info!(
                    event_id,
                    external_id,
                    from = %previous_status,
                    to = %payment.status,
                    "payment transition applied"
                );
                self.dispatch_side_effects(&payment, previous_status).await;
                Ok(ReconcileOutcome::Applied {
                    external_id,
                    status: payment.status,
                })
            }
            crate::ports::TransitionOutcome::Stale { current_status } => {
                self.handle_stale(event_id, external_id, current_status, &transition)
            }
        }
    }

    fn handle_stale(
        &self,
        event_id: &str,
        external_id: String,
        current_status: PaymentStatus,
        transition: &PaymentTransition,
    ) -> Result<ReconcileOutcome, PaymentFlowError> {
        match classify_stale(current_status, transition) {
            StaleKind::Duplicate => {
                info!(event_id, external_id, "duplicate delivery; already applied");
                Ok(ReconcileOutcome::Duplicate { external_id })
            }
            StaleKind::RefundBeforeSuccess => {
                // The success event has not landed yet. Failing the request
                // makes the processor redeliver the refund after it has.
                warn!(
                    event_id,
                    external_id,
                    current = %current_status,
                    "refund arrived before success; requesting redelivery"
                );
                Err(PaymentFlowError::unavailable(
                    "refund received before success was recorded",
                ))
            }
            StaleKind::Conflicting => {
                warn!(
                    event_id,
                    external_id,
                    current = %current_status,
                    attempted = %transition.target,
                    "conflicting out-of-order event discarded"
                );
                Ok(ReconcileOutcome::Discarded {
                    external_id,
                    current_status,
                })
            }
        }
    }

    /// Side effects for a transition that applied. Failures here are
    /// logged, never propagated: the state change is already durable and
    /// a redelivery would be swallowed as a duplicate.
    async fn dispatch_side_effects(&self, payment: &Payment, previous_status: PaymentStatus) {
        match payment.status {
            PaymentStatus::Succeeded => {
                self.mirror_appointment_status(payment, AppointmentPaymentStatus::Paid)
                    .await;
                self.notifier.notify(Notification {
                    recipient: payment.payee_id.clone(),
                    payment_id: payment.id,
                    appointment_id: payment.appointment_id,
                    kind: NotificationKind::PaymentReceived {
                        amount: payment.amount,
                        currency: payment.currency.clone(),
                    },
                });
                self.notifier.notify(Notification {
                    recipient: payment.payer_id.clone(),
                    payment_id: payment.id,
                    appointment_id: payment.appointment_id,
                    kind: NotificationKind::PaymentSuccess {
                        amount: payment.amount,
                        currency: payment.currency.clone(),
                    },
                });
            }
            PaymentStatus::Failed => {
                self.notifier.notify(Notification {
                    recipient: payment.payer_id.clone(),
                    payment_id: payment.id,
                    appointment_id: payment.appointment_id,
                    kind: NotificationKind::PaymentFailed {
                        reason: payment.failure_reason.clone(),
                    },
                });
            }
            PaymentStatus::Refunded => {
                // Mirror and notify only on the first entry into Refunded;
                // later partial refunds just accumulate the amount.
                if previous_status == PaymentStatus::Succeeded {
                    self.mirror_appointment_status(payment, AppointmentPaymentStatus::Refunded)
                        .await;
                    for recipient in [payment.payer_id.clone(), payment.payee_id.clone()] {
                        self.notifier.notify(Notification {
                            recipient,
                            payment_id: payment.id,
                            appointment_id: payment.appointment_id,
                            kind: NotificationKind::RefundIssued {
                                amount: payment.refunded_amount,
                                currency: payment.currency.clone(),
                            },
                        });
                    }
                }
            }
            _ => {}
        }
    }

    async fn mirror_appointment_status(
        &self,
        payment: &Payment,
        status: AppointmentPaymentStatus,
    ) {
        if let Err(err) = self
            .appointments
            .update_payment_status(payment.appointment_id, status)
            .await
        {
            warn!(
                appointment_id = %payment.appointment_id,
                status = status.as_str(),
                error = %err,
                "failed to mirror payment status onto appointment"
            );
        }
    }

    async fn sync_account(
        &self,
        account_id: &str,
        snapshot: AccountCapabilitySnapshot,
    ) -> Result<ReconcileOutcome, PaymentFlowError> {
        let mut account = match self.accounts.find_by_external_id(account_id).await? {
            Some(account) => account,
            None => {
                warn!(account_id, "account event for untracked account; acknowledging");
                return Ok(ReconcileOutcome::AccountUnmatched {
                    account_id: account_id.to_string(),
                });
            }
        };

        let status = snapshot.derive_status();
        if account.charges_enabled == snapshot.charges_enabled
            && account.payouts_enabled == snapshot.payouts_enabled
            && account.status == status
        {
            info!(
                account_id,
                provider_id = %account.provider_id,
                status = status.as_str(),
                "connected account unchanged, skipping write"
            );
            return Ok(ReconcileOutcome::AccountSynced {
                provider_id: account.provider_id,
                status,
            });
        }

        account.charges_enabled = snapshot.charges_enabled;
        account.payouts_enabled = snapshot.payouts_enabled;
        account.status = status;
        account.updated_at = Timestamp::now();
        self.accounts.upsert(&account).await?;

        info!(
            account_id,
            provider_id = %account.provider_id,
            status = status.as_str(),
            "connected account synchronized"
        );

        Ok(ReconcileOutcome::AccountSynced {
            provider_id: account.provider_id,
            status,
        })
    }
}
