//! The pass descriptor (`pass.json`): the structured document the wallet
//! client renders.
//!
//! Key names follow the vendor's schema, so most fields rely on camelCase
//! renaming; `webServiceURL` is the one exception the rename rule gets wrong.

use serde::Serialize;

use glowpass_core::{CustomerId, PassTypeId};

use crate::config::PassConfig;
use crate::models::Customer;

/// Descriptor format version understood by current wallet clients.
const FORMAT_VERSION: u32 = 1;

/// Top-level pass descriptor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassDescriptor {
    pub format_version: u32,
    pub pass_type_identifier: PassTypeId,
    pub serial_number: CustomerId,
    pub team_identifier: String,
    pub organization_name: String,
    pub description: String,
    pub logo_text: String,
    pub background_color: String,
    pub foreground_color: String,
    pub label_color: String,
    /// Callback root the device uses for the registration protocol.
    #[serde(rename = "webServiceURL")]
    pub web_service_url: String,
    /// Bearer token the device presents on protocol calls; derived from the
    /// serial so the registry can validate it without a lookup.
    pub authentication_token: String,
    pub barcode: Barcode,
    pub store_card: StoreCard,
}

/// Scannable barcode; the payload is the pass serial number.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Barcode {
    pub message: String,
    pub format: String,
    pub message_encoding: String,
}

/// Loyalty card layout: visible fields on the front, details on the back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCard {
    pub primary_fields: Vec<Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secondary_fields: Vec<Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub back_fields: Vec<Field>,
}

/// One labeled field on the pass.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub key: String,
    pub label: String,
    pub value: String,
}

impl Field {
    fn new(key: &str, label: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            value: value.into(),
        }
    }
}

impl PassDescriptor {
    /// Render the descriptor for a customer snapshot.
    #[must_use]
    pub fn render(customer: &Customer, config: &PassConfig, base_url: &str) -> Self {
        let serial = customer.id.clone();

        let mut secondary_fields = Vec::new();
        if let Some(next_reward) = &customer.next_reward {
            secondary_fields.push(Field::new("nextReward", "NEXT REWARD", next_reward));
        }

        let mut back_fields = vec![Field::new("member", "MEMBER", &customer.name)];
        if !customer.redeemed_rewards.is_empty() {
            back_fields.push(Field::new(
                "redeemedRewards",
                "REDEEMED REWARDS",
                customer.redeemed_rewards.join(", "),
            ));
        }

        Self {
            format_version: FORMAT_VERSION,
            pass_type_identifier: config.pass_type_id.clone(),
            serial_number: serial.clone(),
            team_identifier: config.team_id.clone(),
            organization_name: config.organization_name.clone(),
            description: format!("{} loyalty card", config.organization_name),
            logo_text: customer.name.clone(),
            background_color: "rgb(255,255,255)".to_owned(),
            foreground_color: "rgb(0,0,0)".to_owned(),
            label_color: "rgb(0,0,0)".to_owned(),
            web_service_url: format!("{}/v1", base_url.trim_end_matches('/')),
            authentication_token: super::authentication_token(&config.pass_type_id, &serial),
            barcode: Barcode {
                message: serial.into_inner(),
                format: "PKBarcodeFormatQR".to_owned(),
                message_encoding: "iso-8859-1".to_owned(),
            },
            store_card: StoreCard {
                primary_fields: vec![Field::new(
                    "visits",
                    "VISITS",
                    customer.progress().to_string(),
                )],
                secondary_fields,
                back_fields,
            },
        }
    }
}
