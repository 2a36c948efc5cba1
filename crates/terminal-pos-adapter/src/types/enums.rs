/*
[INPUT]:  Backend and reader SDK schema definitions
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for backend and reader communication
[UPDATE]: When backend schema changes or new statuses appear
*/

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderStatus {
    Online,
    Offline,
}

/// Reader connection status as reported by the reader SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    NotConnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    #[serde(alias = "cancelled")]
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

impl PaymentIntentStatus {
    /// Funds already moved, nothing left to capture
    pub fn is_succeeded(self) -> bool {
        self == PaymentIntentStatus::Succeeded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    CardPresent,
    InteracPresent,
}

impl PaymentMethodType {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethodType::CardPresent => "card_present",
            PaymentMethodType::InteracPresent => "interac_present",
        }
    }
}
