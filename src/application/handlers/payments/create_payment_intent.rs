//! CreatePaymentIntentHandler - Command handler for starting a split payment.

use std::sync::Arc;

use tracing::{error, warn};

use crate::domain::foundation::{
    platform_fee, to_minor_units, AppointmentId, FeePercentage, PaymentId, Timestamp, UserId,
};
use crate::domain::payment::{Payment, PaymentFlowError, PaymentStatus};
use crate::ports::{
    AppointmentDirectory, CreateCustomerRequest, CreateIntentRequest, GatewayError, PaymentLedger,
    ProcessorGateway, ProviderAccountStore, UserDirectory,
};

/// Command to create a payment intent for an appointment.
#[derive(Debug, Clone)]
pub struct CreatePaymentIntentCommand {
    pub appointment_id: AppointmentId,
    pub requested_by: UserId,
}

/// Result of successful intent creation.
#[derive(Debug, Clone)]
pub struct CreatePaymentIntentResult {
    pub payment: Payment,

    /// Secret the frontend uses to confirm the intent with the processor.
    pub client_secret: String,
}

/// Handler for creating a destination-charge payment intent.
///
/// Derives amounts from the listed service price, routes the charge to the
/// provider's connected account with the platform fee withheld, and records
/// the payment row before returning. Settlement happens later via webhooks.
pub struct CreatePaymentIntentHandler {
    appointments: Arc<dyn AppointmentDirectory>,
    users: Arc<dyn UserDirectory>,
    accounts: Arc<dyn ProviderAccountStore>,
    ledger: Arc<dyn PaymentLedger>,
    gateway: Arc<dyn ProcessorGateway>,
    fee_percentage: FeePercentage,
}

impl CreatePaymentIntentHandler {
    pub fn new(
        appointments: Arc<dyn AppointmentDirectory>,
        users: Arc<dyn UserDirectory>,
        accounts: Arc<dyn ProviderAccountStore>,
        ledger: Arc<dyn PaymentLedger>,
        gateway: Arc<dyn ProcessorGateway>,
        fee_percentage: FeePercentage,
    ) -> Self {
        Self {
            appointments,
            users,
            accounts,
            ledger,
            gateway,
            fee_percentage,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreatePaymentIntentCommand,
    ) -> Result<CreatePaymentIntentResult, PaymentFlowError> {
        // 1. Load the appointment
        let appointment = self
            .appointments
            .find(cmd.appointment_id)
            .await?
            .ok_or(PaymentFlowError::AppointmentNotFound(cmd.appointment_id))?;

        // 2. Only the booking owner may pay
        if appointment.owner_id != cmd.requested_by {
            return Err(PaymentFlowError::Forbidden);
        }

        // 3. Reject when a live or settled payment already exists
        let existing = self.ledger.find_by_appointment(cmd.appointment_id).await?;
        if let Some(blocking) = existing.iter().find(|p| p.blocks_new_intent()) {
            return Err(match blocking.status {
                PaymentStatus::Succeeded | PaymentStatus::Refunded => {
                    PaymentFlowError::AlreadyPaid
                }
                _ => PaymentFlowError::PaymentInProgress,
            });
        }

        // 4. Derive amounts from the listed price
        let price = appointment
            .service_price
            .ok_or_else(|| PaymentFlowError::invalid_state("service has no price"))?;
        let amount = to_minor_units(price)
            .map_err(|e| PaymentFlowError::invalid_state(e.to_string()))?;
        if amount == 0 {
            return Err(PaymentFlowError::invalid_state("service price is zero"));
        }

        let fee = platform_fee(amount, self.fee_percentage);
        if fee < 0 || fee >= amount {
            error!(
                appointment_id = %cmd.appointment_id,
                amount,
                fee,
                "platform fee outside [0, amount); refusing to create intent"
            );
            return Err(PaymentFlowError::internal_invariant(format!(
                "fee {} outside [0, {})",
                fee, amount
            )));
        }

        // 5. Provider must be able to receive the transfer
        let payout_account = self
            .accounts
            .find_by_provider(&appointment.provider_id)
            .await?
            .filter(|account| account.payout_ready())
            .ok_or(PaymentFlowError::PayeeNotReady)?;

        // 6. Ensure the payer has a processor customer
        let payer = self
            .users
            .find(&appointment.owner_id)
            .await?
            .ok_or_else(|| PaymentFlowError::internal("payer has no user record"))?;

        let customer_id = match payer.processor_customer_id {
            Some(id) => id,
            None => {
                let customer = self
                    .gateway
                    .create_customer(CreateCustomerRequest {
                        user_id: payer.id.clone(),
                        email: payer.email.clone(),
                        name: payer.display_name.clone(),
                    })
                    .await
                    .map_err(map_gateway_error)?;
                self.users
                    .set_processor_customer_id(&payer.id, &customer.id)
                    .await?;
                customer.id
            }
        };

        // 7. Create the intent at the processor
        let payment_id = PaymentId::new();
        let intent = self
            .gateway
            .create_payment_intent(CreateIntentRequest {
                amount,
                currency: appointment.currency.clone(),
                customer_id: customer_id.clone(),
                application_fee: fee,
                destination_account_id: payout_account.external_account_id.clone(),
                payment_id,
                appointment_id: cmd.appointment_id,
                service_id: appointment.service_id,
                payer_id: appointment.owner_id.clone(),
                payee_id: appointment.provider_id.clone(),
            })
            .await
            .map_err(map_gateway_error)?;

        // 8. Record the payment row
        let now = Timestamp::now();
        let payment = Payment {
            id: payment_id,
            external_id: intent.external_id.clone(),
            appointment_id: cmd.appointment_id,
            service_id: appointment.service_id,
            payer_id: appointment.owner_id.clone(),
            payee_id: appointment.provider_id.clone(),
            amount,
            fee_amount: fee,
            currency: appointment.currency.clone(),
            refunded_amount: 0,
            status: intent.status,
            processor_customer_id: customer_id,
            destination_account_id: payout_account.external_account_id,
            method_summary: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.ledger.insert(&payment).await {
            // The intent exists at the processor but we could not record
            // it. Cancel it so the payer cannot confirm an untracked charge.
            if let Err(cancel_err) = self
                .gateway
                .cancel_payment_intent(&intent.external_id)
                .await
            {
                warn!(
                    external_id = %intent.external_id,
                    error = %cancel_err,
                    "failed to cancel intent after ledger insert failure"
                );
            }
            return Err(err.into());
        }

        Ok(CreatePaymentIntentResult {
            payment,
            client_secret: intent.client_secret,
        })
    }
}

fn map_gateway_error(err: GatewayError) -> PaymentFlowError {
    if err.retryable {
        PaymentFlowError::unavailable(err.to_string())
    } else {
        PaymentFlowError::internal(err.to_string())
    }
}
