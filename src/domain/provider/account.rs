//! Provider payout account and connected-account status derivation.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// Connected-account status derived from processor capability state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Provider has not finished onboarding with the processor.
    OnboardingIncomplete,

    /// Requirements outstanding but not yet past due.
    PendingVerification,

    /// Past-due requirements; payouts may be paused.
    Restricted,

    /// Processor has disabled the account.
    Disabled,

    /// Charges and payouts both enabled.
    Verified,
}

impl AccountStatus {
    /// Stable string code used in the database and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::OnboardingIncomplete => "onboarding_incomplete",
            AccountStatus::PendingVerification => "pending_verification",
            AccountStatus::Restricted => "restricted",
            AccountStatus::Disabled => "disabled",
            AccountStatus::Verified => "verified",
        }
    }

    /// Parse the stable string code.
    pub fn parse(s: &str) -> Option<AccountStatus> {
        match s {
            "onboarding_incomplete" => Some(AccountStatus::OnboardingIncomplete),
            "pending_verification" => Some(AccountStatus::PendingVerification),
            "restricted" => Some(AccountStatus::Restricted),
            "disabled" => Some(AccountStatus::Disabled),
            "verified" => Some(AccountStatus::Verified),
            _ => None,
        }
    }
}

/// Point-in-time capability state reported by the processor for a
/// connected account, either embedded in an event or fetched on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCapabilitySnapshot {
    /// Whether the account can currently accept charges.
    pub charges_enabled: bool,

    /// Whether the account can currently receive payouts.
    pub payouts_enabled: bool,

    /// Processor-reported reason the account is disabled, if any.
    pub disabled_reason: Option<String>,

    /// Requirement keys that are past due.
    pub past_due: Vec<String>,

    /// Requirement keys still outstanding (not yet past due).
    pub currently_due: Vec<String>,
}

impl AccountCapabilitySnapshot {
    /// Derive the account status by priority: disabled > restricted >
    /// pending verification > verified > onboarding incomplete.
    pub fn derive_status(&self) -> AccountStatus {
        if self.disabled_reason.is_some() {
            AccountStatus::Disabled
        } else if !self.past_due.is_empty() {
            AccountStatus::Restricted
        } else if !self.currently_due.is_empty() {
            AccountStatus::PendingVerification
        } else if self.charges_enabled && self.payouts_enabled {
            AccountStatus::Verified
        } else {
            AccountStatus::OnboardingIncomplete
        }
    }

    /// Whether the account can receive a destination transfer right now.
    pub fn payout_ready(&self) -> bool {
        self.charges_enabled && self.payouts_enabled
    }
}

/// A provider's payout account as stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPayoutAccount {
    /// The provider this account belongs to.
    pub provider_id: UserId,

    /// Processor connected-account identifier.
    pub external_account_id: String,

    /// Mirror of the processor's charge capability.
    pub charges_enabled: bool,

    /// Mirror of the processor's payout capability.
    pub payouts_enabled: bool,

    /// Derived status, kept in sync by the synchronizer.
    pub status: AccountStatus,

    /// Last time the synchronizer wrote this record.
    pub updated_at: Timestamp,
}

impl ProviderPayoutAccount {
    /// Whether this provider can be the destination of a split payment.
    pub fn payout_ready(&self) -> bool {
        self.charges_enabled && self.payouts_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> AccountCapabilitySnapshot {
        AccountCapabilitySnapshot {
            charges_enabled: true,
            payouts_enabled: true,
            disabled_reason: None,
            past_due: vec![],
            currently_due: vec![],
        }
    }

    #[test]
    fn fully_enabled_account_is_verified() {
        assert_eq!(snapshot().derive_status(), AccountStatus::Verified);
    }

    #[test]
    fn disabled_reason_wins_over_everything() {
        let snap = AccountCapabilitySnapshot {
            disabled_reason: Some("requirements.past_due".to_string()),
            past_due: vec!["individual.id_number".to_string()],
            ..snapshot()
        };
        assert_eq!(snap.derive_status(), AccountStatus::Disabled);
    }

    #[test]
    fn past_due_requirements_mean_restricted() {
        let snap = AccountCapabilitySnapshot {
            past_due: vec!["individual.verification.document".to_string()],
            currently_due: vec!["external_account".to_string()],
            ..snapshot()
        };
        assert_eq!(snap.derive_status(), AccountStatus::Restricted);
    }

    #[test]
    fn outstanding_requirements_mean_pending_verification() {
        let snap = AccountCapabilitySnapshot {
            currently_due: vec!["external_account".to_string()],
            ..snapshot()
        };
        assert_eq!(snap.derive_status(), AccountStatus::PendingVerification);
    }

    #[test]
    fn no_capabilities_and_no_requirements_means_onboarding_incomplete() {
        let snap = AccountCapabilitySnapshot {
            charges_enabled: false,
            payouts_enabled: false,
            ..snapshot()
        };
        assert_eq!(snap.derive_status(), AccountStatus::OnboardingIncomplete);
    }

    #[test]
    fn partially_enabled_account_is_not_payout_ready() {
        let snap = AccountCapabilitySnapshot {
            payouts_enabled: false,
            ..snapshot()
        };
        assert!(!snap.payout_ready());
    }

    #[test]
    fn status_codec_roundtrips() {
        for status in [
            AccountStatus::OnboardingIncomplete,
            AccountStatus::PendingVerification,
            AccountStatus::Restricted,
            AccountStatus::Disabled,
            AccountStatus::Verified,
        ] {
            assert_eq!(AccountStatus::parse(status.as_str()), Some(status));
        }
    }
}
