//! Customer record as seen by the wallet core.
//!
//! The customer/loyalty store owns the full record; this model carries only
//! the fields the wallet core reads or writes. The customer id doubles as the
//! pass serial number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use glowpass_core::{CustomerId, DeviceLibraryId, PassTypeId, PushToken, RewardProgress};

/// Wallet linkage mirrored onto the customer record by the registration
/// registry for redundant push-token lookup.
///
/// The fields are all-or-nothing: a customer either has a complete link or
/// none at all, which is why they live in one struct behind an `Option`
/// rather than as three independent nullable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletLink {
    pub push_token: PushToken,
    pub pass_type_id: PassTypeId,
    pub device_library_id: DeviceLibraryId,
}

/// A loyalty customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Customer identifier; acts as the wallet pass serial number.
    pub id: CustomerId,
    /// Display name rendered on the pass.
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Total recorded visits.
    #[serde(default)]
    pub visits: u32,
    /// Human-readable description of the next reward, if configured.
    #[serde(default)]
    pub next_reward: Option<String>,
    /// Rewards the customer has already redeemed.
    #[serde(default)]
    pub redeemed_rewards: Vec<String>,
    /// Mirrored wallet linkage, present once a device has registered.
    #[serde(default)]
    pub wallet_link: Option<WalletLink>,
    /// When the pass content last changed; the source of truth for the
    /// `passesUpdatedSince` poll.
    #[serde(default)]
    pub last_pass_update: Option<DateTime<Utc>>,
}

impl Customer {
    /// Reward progress derived from the visit count.
    #[must_use]
    pub const fn progress(&self) -> RewardProgress {
        RewardProgress::new(self.visits)
    }

    /// Push token from the mirrored link, if any.
    #[must_use]
    pub fn push_token(&self) -> Option<&PushToken> {
        self.wallet_link.as_ref().map(|link| &link.push_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(visits: u32) -> Customer {
        Customer {
            id: CustomerId::new("C1"),
            name: "Ana Torres".to_owned(),
            email: None,
            visits,
            next_reward: Some("Free facial".to_owned()),
            redeemed_rewards: vec![],
            wallet_link: None,
            last_pass_update: None,
        }
    }

    #[test]
    fn test_progress_from_visits() {
        assert_eq!(customer(3).progress().to_string(), "3/5");
    }

    #[test]
    fn test_deserialize_minimal_payload() {
        let json = r#"{"id": "C1", "name": "Ana Torres"}"#;
        let c: Customer = serde_json::from_str(json).unwrap();
        assert_eq!(c.id.as_str(), "C1");
        assert_eq!(c.visits, 0);
        assert!(c.wallet_link.is_none());
        assert!(c.last_pass_update.is_none());
    }

    #[test]
    fn test_wallet_link_is_all_or_nothing() {
        // A partial link does not deserialize; the type makes drifted
        // half-links unrepresentable.
        let json = r#"{"pushToken": "t", "passTypeId": "pass.com.glowpass"}"#;
        assert!(serde_json::from_str::<WalletLink>(json).is_err());
    }
}
