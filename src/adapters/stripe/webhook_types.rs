//! Stripe-specific types for webhook handling.
//!
//! These types represent Stripe API objects as they arrive in webhook
//! payloads. They parse actual Stripe JSON and map to the domain event
//! model for further processing.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    /// Header is empty or missing.
    MissingHeader,
    /// Missing timestamp component (t=...).
    MissingTimestamp,
    /// Missing v1 signature component.
    MissingV1Signature,
    /// Invalid timestamp format.
    InvalidTimestamp,
    /// Invalid signature format (not valid hex).
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "Missing Stripe-Signature header"),
            Self::MissingTimestamp => write!(f, "Missing timestamp (t=) in signature"),
            Self::MissingV1Signature => write!(f, "Missing v1 signature in header"),
            Self::InvalidTimestamp => write!(f, "Invalid timestamp format"),
            Self::InvalidSignatureFormat => write!(f, "Invalid signature format (not valid hex)"),
        }
    }
}

impl std::error::Error for SignatureParseError {}

/// Parsed Stripe-Signature header components.
///
/// The header format is: `t=timestamp,v1=signature[,v0=legacy_signature]`
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    /// Unix timestamp when Stripe generated the event.
    pub timestamp: i64,

    /// Primary v1 signature (HMAC-SHA256, hex-encoded).
    pub v1_signature: Vec<u8>,

    /// Legacy v0 signature (deprecated, may be absent).
    pub v0_signature: Option<Vec<u8>>,
}

impl SignatureHeader {
    /// Parse a Stripe-Signature header into components.
    ///
    /// # Format
    ///
    /// ```text
    /// t=<timestamp>,v1=<signature>[,v0=<legacy_signature>]
    /// ```
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;
        let mut v0_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or(SignatureParseError::MissingTimestamp)?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signature = Some(
                        hex_decode(value.trim())
                            .ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                "v0" => {
                    v0_signature = Some(
                        hex_decode(value.trim())
                            .ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        Ok(Self {
            timestamp: timestamp.ok_or(SignatureParseError::MissingTimestamp)?,
            v1_signature: v1_signature.ok_or(SignatureParseError::MissingV1Signature)?,
            v0_signature,
        })
    }
}

/// Decode a hex string to bytes.
fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if !hex.len().is_multiple_of(2) {
        return None;
    }

    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16).ok()?;
        bytes.push(byte);
    }
    Some(bytes)
}

/// Encode bytes to hex string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Event Types
// ════════════════════════════════════════════════════════════════════════════════

/// Raw Stripe webhook event as received from the API.
///
/// This represents the full event envelope containing metadata and payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    /// Event type (e.g., "payment_intent.succeeded").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the event was created.
    pub created: i64,

    /// Event payload containing the affected object.
    pub data: StripeEventData,

    /// Whether this is a live or test event.
    pub livemode: bool,

    /// Stripe API version used for this event.
    pub api_version: Option<String>,

    /// Number of retries for this webhook delivery.
    #[serde(default)]
    pub pending_webhooks: i32,
}

/// Event data container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object affected by this event.
    pub object: serde_json::Value,

    /// Previous values for updated fields (on update events).
    pub previous_attributes: Option<serde_json::Value>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Object Types
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe PaymentIntent object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentIntent {
    /// Unique intent identifier (pi_...).
    pub id: String,

    /// Intent status (requires_payment_method, processing, succeeded, ...).
    pub status: String,

    /// Amount in minor currency units.
    pub amount: i64,

    /// Currency (lowercase).
    pub currency: String,

    /// Customer being charged.
    pub customer: Option<String>,

    /// Client secret for frontend confirmation. Only present on API
    /// responses, never forwarded from webhook payloads.
    pub client_secret: Option<String>,

    /// Last payment error, present on failure events.
    pub last_payment_error: Option<StripePaymentError>,

    /// Charges created by this intent. Webhook payloads embed the latest
    /// charge here; used for the instrument summary on success.
    #[serde(default)]
    pub charges: StripeChargeList,

    /// Custom metadata.
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl StripePaymentIntent {
    /// Card summary from the latest charge, when present.
    pub fn method_details(&self) -> Option<&StripePaymentMethodDetails> {
        self.charges
            .data
            .first()
            .and_then(|charge| charge.payment_method_details.as_ref())
    }

    /// Failure description: processor message, falling back to the
    /// decline/error code.
    pub fn failure_reason(&self) -> Option<String> {
        let err = self.last_payment_error.as_ref()?;
        err.message.clone().or_else(|| err.code.clone())
    }
}

/// Payment error embedded in a failed intent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentError {
    /// Error code (e.g., "card_declined").
    pub code: Option<String>,

    /// Decline code from the card network.
    pub decline_code: Option<String>,

    /// Human-readable message.
    pub message: Option<String>,
}

/// Charges container embedded in a payment intent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeChargeList {
    /// List of charges, newest first.
    #[serde(default)]
    pub data: Vec<StripeCharge>,
}

/// Stripe Charge object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCharge {
    /// Unique charge identifier (ch_...).
    pub id: String,

    /// Payment intent that created this charge.
    pub payment_intent: Option<String>,

    /// Charge amount in minor units.
    #[serde(default)]
    pub amount: i64,

    /// Cumulative refunded amount in minor units.
    #[serde(default)]
    pub amount_refunded: i64,

    /// Whether the charge is fully refunded.
    #[serde(default)]
    pub refunded: bool,

    /// Instrument details.
    pub payment_method_details: Option<StripePaymentMethodDetails>,
}

/// Instrument details on a charge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentMethodDetails {
    /// Instrument type ("card", "link", ...).
    #[serde(rename = "type")]
    pub method_type: String,

    /// Card details, when the instrument is a card.
    pub card: Option<StripeCardDetails>,
}

/// Card details within payment method details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCardDetails {
    /// Card brand ("visa", "mastercard", ...).
    pub brand: Option<String>,

    /// Last four digits.
    pub last4: Option<String>,
}

/// Stripe connected Account object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeAccount {
    /// Unique account identifier (acct_...).
    pub id: String,

    /// Whether the account can accept charges.
    #[serde(default)]
    pub charges_enabled: bool,

    /// Whether the account can receive payouts.
    #[serde(default)]
    pub payouts_enabled: bool,

    /// Outstanding verification requirements.
    #[serde(default)]
    pub requirements: StripeAccountRequirements,
}

/// Requirements block on a connected account.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeAccountRequirements {
    /// Reason the account is disabled, if any.
    pub disabled_reason: Option<String>,

    /// Requirement keys that are past due.
    #[serde(default)]
    pub past_due: Vec<String>,

    /// Requirement keys still outstanding.
    #[serde(default)]
    pub currently_due: Vec<String>,
}

/// Stripe Customer object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    /// Customer email address.
    pub email: Option<String>,

    /// Whether the customer has been deleted.
    #[serde(default)]
    pub deleted: bool,
}

/// Stripe AccountLink object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeAccountLink {
    /// One-time onboarding URL.
    pub url: String,

    /// When the link expires (Unix timestamp).
    pub expires_at: i64,
}

/// Stripe API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorEnvelope {
    pub error: StripeApiError,
}

/// Error body returned by the Stripe API.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    /// Error category ("invalid_request_error", "card_error", ...).
    #[serde(rename = "type", default)]
    pub error_type: String,

    /// Machine-readable code.
    pub code: Option<String>,

    /// Human-readable message.
    pub message: Option<String>,
}
