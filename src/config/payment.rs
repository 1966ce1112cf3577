//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Platform fee as a fraction of the charge, in [0, 1)
    #[serde(default = "default_fee_percentage")]
    pub fee_percentage: f64,

    /// Reject test-mode webhook events (enforced in production)
    #[serde(default)]
    pub require_livemode: bool,
}

fn default_fee_percentage() -> f64 {
    0.10
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            fee_percentage: default_fee_percentage(),
            require_livemode: false,
        }
    }
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if !(0.0..1.0).contains(&self.fee_percentage) {
            return Err(ValidationError::InvalidFeePercentage);
        }

        Ok(())
    }
}
