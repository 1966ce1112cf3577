//! Stripe processor gateway adapter.
//!
//! Implements the `ProcessorGateway` trait for Stripe API integration.
//! Handles destination-charge payment intents, connected accounts for
//! provider payouts, and webhook verification.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret);
//! let adapter = StripeGatewayAdapter::new(config);
//! ```

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::payment::{GatewayEvent, GatewayEventKind, PaymentMethodSummary, PaymentStatus};
use crate::domain::provider::AccountCapabilitySnapshot;
use crate::ports::{
    ConnectedAccount, CreateAccountRequest, CreateCustomerRequest, CreateIntentRequest,
    GatewayError, GatewayErrorCode, IntentHandle, OnboardingLink, ProcessorCustomer,
    ProcessorGateway,
};

use super::webhook_types::{
    hex_encode, SignatureHeader, StripeAccount, StripeAccountLink, StripeCharge, StripeCustomer,
    StripeErrorEnvelope, StripePaymentIntent, StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Stripe error codes that mean the destination account cannot take
/// this charge.
const DESTINATION_ERROR_CODES: &[&str] = &[
    "account_invalid",
    "transfers_not_allowed",
    "insufficient_capabilities_for_transfer",
];

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Whether to require livemode events in production.
    require_livemode: bool,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe processor gateway adapter.
///
/// Implements `ProcessorGateway` for Stripe API integration.
pub struct StripeGatewayAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGatewayAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verify webhook signature using HMAC-SHA256.
    ///
    /// # Security
    ///
    /// - Uses constant-time comparison to prevent timing attacks
    /// - Validates timestamp to prevent replay attacks
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
    ) -> Result<(), GatewayError> {
        // 1. Validate timestamp (prevent replay attacks)
        let now = chrono::Utc::now().timestamp();
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(GatewayError::signature_invalid(format!(
                "Event too old ({} seconds)",
                age
            )));
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(GatewayError::signature_invalid("Event timestamp in future"));
        }

        // 2. Compute expected signature over "{timestamp}.{payload}",
        //    feeding the body bytes as received so non-UTF-8 payloads
        //    verify against what Stripe actually signed
        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .expect("HMAC can take key of any size");

        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        // 3. Constant-time comparison
        let expected_bytes: &[u8] = expected.as_slice();
        let provided_bytes: &[u8] = &header.v1_signature;

        if expected_bytes.ct_eq(provided_bytes).unwrap_u8() != 1 {
            tracing::warn!(
                expected_signature = hex_encode(expected_bytes),
                "Invalid webhook signature"
            );
            return Err(GatewayError::signature_invalid("Invalid signature"));
        }

        Ok(())
    }

    /// Parse a Stripe event and convert to the domain event model.
    fn parse_event(&self, payload: &[u8]) -> Result<GatewayEvent, GatewayError> {
        let stripe_event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            GatewayError::signature_invalid(format!("Invalid JSON: {}", e))
        })?;

        // Check livemode if required
        if self.config.require_livemode && !stripe_event.livemode {
            tracing::warn!(
                event_id = %stripe_event.id,
                "Rejected test mode event in production"
            );
            return Err(GatewayError::signature_invalid(
                "Test mode events not allowed in production",
            ));
        }

        let kind = self.classify_event(&stripe_event)?;

        Ok(GatewayEvent {
            id: stripe_event.id,
            kind,
            created_at: stripe_event.created,
        })
    }

    /// Map the Stripe event type and payload onto the closed event set.
    fn classify_event(&self, event: &StripeWebhookEvent) -> Result<GatewayEventKind, GatewayError> {
        match event.event_type.as_str() {
            "payment_intent.succeeded" => {
                let intent = parse_object::<StripePaymentIntent>(event)?;
                let method_summary = intent.method_details().map(|details| PaymentMethodSummary {
                    kind: details.method_type.clone(),
                    brand: details.card.as_ref().and_then(|c| c.brand.clone()),
                    last4: details.card.as_ref().and_then(|c| c.last4.clone()),
                });
                Ok(GatewayEventKind::PaymentSucceeded {
                    external_id: intent.id,
                    method_summary,
                })
            }
            "payment_intent.payment_failed" => {
                let intent = parse_object::<StripePaymentIntent>(event)?;
                let reason = intent.failure_reason();
                Ok(GatewayEventKind::PaymentFailed {
                    external_id: intent.id,
                    reason,
                })
            }
            "payment_intent.processing" => {
                let intent = parse_object::<StripePaymentIntent>(event)?;
                Ok(GatewayEventKind::PaymentProcessing {
                    external_id: intent.id,
                })
            }
            "payment_intent.requires_action" => {
                let intent = parse_object::<StripePaymentIntent>(event)?;
                Ok(GatewayEventKind::PaymentRequiresAction {
                    external_id: intent.id,
                })
            }
            "payment_intent.canceled" => {
                let intent = parse_object::<StripePaymentIntent>(event)?;
                Ok(GatewayEventKind::PaymentCanceled {
                    external_id: intent.id,
                })
            }
            "charge.refunded" => {
                let charge = parse_object::<StripeCharge>(event)?;
                match charge.payment_intent {
                    Some(external_id) => Ok(GatewayEventKind::ChargeRefunded {
                        external_id,
                        amount_refunded: charge.amount_refunded,
                    }),
                    None => {
                        // A refund on a charge created outside the intent
                        // flow; nothing for us to reconcile.
                        tracing::warn!(
                            charge_id = %charge.id,
                            "Refunded charge has no payment intent"
                        );
                        Ok(GatewayEventKind::Unknown {
                            event_type: event.event_type.clone(),
                        })
                    }
                }
            }
            "account.updated" => {
                let account = parse_object::<StripeAccount>(event)?;
                Ok(GatewayEventKind::AccountUpdated {
                    account_id: account.id,
                    snapshot: AccountCapabilitySnapshot {
                        charges_enabled: account.charges_enabled,
                        payouts_enabled: account.payouts_enabled,
                        disabled_reason: account.requirements.disabled_reason,
                        past_due: account.requirements.past_due,
                        currently_due: account.requirements.currently_due,
                    },
                })
            }
            other => Ok(GatewayEventKind::Unknown {
                event_type: other.to_string(),
            }),
        }
    }

    /// Turn a non-2xx Stripe response into a gateway error.
    async fn response_error(&self, operation: &str, response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(operation, status = %status, error = %body, "Stripe API error");

        if status.as_u16() == 429 || status.is_server_error() {
            return GatewayError::unavailable(format!("Stripe {} ({})", operation, status));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return GatewayError::not_found(operation);
        }

        match serde_json::from_str::<StripeErrorEnvelope>(&body) {
            Ok(envelope) => {
                let code = envelope.error.code.unwrap_or_default();
                let message = envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("Stripe {} failed", operation));
                if DESTINATION_ERROR_CODES.contains(&code.as_str()) {
                    GatewayError::invalid_destination(message).with_provider_code(code)
                } else {
                    GatewayError::invalid_request(message).with_provider_code(code)
                }
            }
            Err(_) => GatewayError::new(
                GatewayErrorCode::Unknown,
                format!("Stripe {} failed: {}", operation, body),
            ),
        }
    }
}

#[async_trait]
impl ProcessorGateway for StripeGatewayAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<ProcessorCustomer, GatewayError> {
        let url = format!("{}/v1/customers", self.config.api_base_url);

        let mut params = vec![
            ("email", request.email.clone()),
            ("metadata[user_id]", request.user_id.to_string()),
        ];
        if let Some(name) = &request.name {
            params.push(("name", name.clone()));
        }

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.response_error("create_customer", response).await);
        }

        let customer: StripeCustomer = response
            .json()
            .await
            .map_err(|e| parse_failure("create_customer", e))?;

        Ok(ProcessorCustomer {
            id: customer.id,
            email: customer.email.unwrap_or(request.email),
        })
    }

    async fn create_payment_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<IntentHandle, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.config.api_base_url);

        let params = vec![
            ("amount", request.amount.to_string()),
            ("currency", request.currency.clone()),
            ("customer", request.customer_id.clone()),
            ("application_fee_amount", request.application_fee.to_string()),
            (
                "transfer_data[destination]",
                request.destination_account_id.clone(),
            ),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[payment_id]", request.payment_id.to_string()),
            (
                "metadata[appointment_id]",
                request.appointment_id.to_string(),
            ),
            ("metadata[service_id]", request.service_id.to_string()),
            ("metadata[payer_id]", request.payer_id.to_string()),
            ("metadata[payee_id]", request.payee_id.to_string()),
        ];

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", request.payment_id.to_string())
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.response_error("create_payment_intent", response).await);
        }

        let intent: StripePaymentIntent = response
            .json()
            .await
            .map_err(|e| parse_failure("create_payment_intent", e))?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            GatewayError::new(
                GatewayErrorCode::Unknown,
                "Stripe intent response missing client_secret",
            )
        })?;

        Ok(IntentHandle {
            external_id: intent.id,
            client_secret,
            status: PaymentStatus::from_processor_initial(&intent.status),
        })
    }

    async fn cancel_payment_intent(&self, external_id: &str) -> Result<(), GatewayError> {
        let url = format!(
            "{}/v1/payment_intents/{}/cancel",
            self.config.api_base_url, external_id
        );

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.response_error("cancel_payment_intent", response).await);
        }

        Ok(())
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<GatewayEvent, GatewayError> {
        // 1. Parse signature header
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            GatewayError::signature_invalid(e.to_string())
        })?;

        // 2. Verify signature (includes timestamp validation)
        self.verify_signature(payload, &header)?;

        // 3. Parse and convert event
        let event = self.parse_event(payload)?;

        tracing::info!(
            event_id = %event.id,
            "Webhook signature verified"
        );

        Ok(event)
    }

    async fn create_connected_account(
        &self,
        request: CreateAccountRequest,
    ) -> Result<ConnectedAccount, GatewayError> {
        let url = format!("{}/v1/accounts", self.config.api_base_url);

        let params = vec![
            ("type", "express".to_string()),
            ("email", request.email.clone()),
            ("country", request.country.clone()),
            ("capabilities[card_payments][requested]", "true".to_string()),
            ("capabilities[transfers][requested]", "true".to_string()),
            ("metadata[provider_id]", request.provider_id.to_string()),
        ];

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self
                .response_error("create_connected_account", response)
                .await);
        }

        let account: StripeAccount = response
            .json()
            .await
            .map_err(|e| parse_failure("create_connected_account", e))?;

        Ok(ConnectedAccount { id: account.id })
    }

    async fn create_onboarding_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<OnboardingLink, GatewayError> {
        let url = format!("{}/v1/account_links", self.config.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&[
                ("account", account_id),
                ("refresh_url", refresh_url),
                ("return_url", return_url),
                ("type", "account_onboarding"),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.response_error("create_onboarding_link", response).await);
        }

        let link: StripeAccountLink = response
            .json()
            .await
            .map_err(|e| parse_failure("create_onboarding_link", e))?;

        Ok(OnboardingLink {
            url: link.url,
            expires_at: link.expires_at,
        })
    }

    async fn retrieve_account(
        &self,
        account_id: &str,
    ) -> Result<AccountCapabilitySnapshot, GatewayError> {
        let url = format!("{}/v1/accounts/{}", self.config.api_base_url, account_id);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.response_error("retrieve_account", response).await);
        }

        let account: StripeAccount = response
            .json()
            .await
            .map_err(|e| parse_failure("retrieve_account", e))?;

        Ok(AccountCapabilitySnapshot {
            charges_enabled: account.charges_enabled,
            payouts_enabled: account.payouts_enabled,
            disabled_reason: account.requirements.disabled_reason,
            past_due: account.requirements.past_due,
            currently_due: account.requirements.currently_due,
        })
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(
    event: &StripeWebhookEvent,
) -> Result<T, GatewayError> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        GatewayError::signature_invalid(format!(
            "Invalid {} payload: {}",
            event.event_type, e
        ))
    })
}

fn parse_failure(operation: &str, err: reqwest::Error) -> GatewayError {
    GatewayError::new(
        GatewayErrorCode::Unknown,
        format!("Failed to parse Stripe {} response: {}", operation, err),
    )
}
