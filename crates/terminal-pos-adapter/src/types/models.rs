/*
[INPUT]:  Backend object schemas and reader SDK payloads
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for backend and reader communication
[UPDATE]: When backend/SDK schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use super::enums::{PaymentIntentStatus, ReaderStatus};

/// Card-present reader as returned by the backend or the reader SDK
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reader {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub status: Option<ReaderStatus>,
    #[serde(default)]
    pub device_type: Option<String>,
    /// Location id; expanded location objects collapse to their id
    #[serde(default, deserialize_with = "serde_helpers::deserialize_id_or_object")]
    pub location: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl Reader {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Amount in minor currency units
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    pub status: PaymentIntentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Shortcut field added by the backend on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_charge: Option<String>,
}

impl PaymentIntent {
    /// Client secret used to collect a payment method for this intent
    pub fn collection_secret(&self) -> Option<&str> {
        self.secret.as_deref().or(self.client_secret.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    #[serde(default)]
    pub charge: Option<String>,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Options for reader discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    #[serde(default)]
    pub simulated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl DiscoveryOptions {
    pub fn simulated() -> Self {
        Self {
            simulated: true,
            location: None,
        }
    }
}

/// Cart payload shown on the reader screen; every amount in minor units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderDisplay {
    #[serde(rename = "type")]
    pub kind: String,
    pub cart: DisplayCart,
}

impl ReaderDisplay {
    pub fn cart(cart: DisplayCart) -> Self {
        Self {
            kind: "cart".to_string(),
            cart,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayCart {
    pub line_items: Vec<DisplayLineItem>,
    pub tax: i64,
    pub total: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayLineItem {
    pub description: String,
    pub amount: i64,
    pub quantity: u32,
}

/// Test-mode settings applied to the simulated reader before collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorConfiguration {
    pub test_payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_card_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_amount: Option<i64>,
}

impl Default for SimulatorConfiguration {
    fn default() -> Self {
        Self {
            test_payment_method: "visa".to_string(),
            test_card_number: None,
            tip_amount: None,
        }
    }
}

mod serde_helpers {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize_id_or_object<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(id)) => Ok(Some(id)),
            Some(Value::Object(map)) => match map.get("id") {
                Some(Value::String(id)) => Ok(Some(id.clone())),
                _ => Err(serde::de::Error::custom("location object without id")),
            },
            Some(other) => Err(serde::de::Error::custom(format!(
                "expected location id or object, got {other}"
            ))),
        }
    }
}
