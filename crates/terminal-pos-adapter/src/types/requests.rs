/*
[INPUT]:  Backend endpoint request schemas
[OUTPUT]: Typed request structs and their form-encoded field lists
[POS]:    Data layer - type definitions for backend communication
[UPDATE]: When backend request fields change
*/

use serde::{Deserialize, Serialize};

use super::enums::PaymentMethodType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterReaderRequest {
    pub label: String,
    pub registration_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl RegisterReaderRequest {
    /// Form fields; `location` is omitted when unset so the backend creates its default.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("label", self.label.clone()),
            ("registration_code", self.registration_code.clone()),
        ];
        if let Some(location) = &self.location {
            fields.push(("location", location.clone()));
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub payment_method_types: Vec<PaymentMethodType>,
}

impl CreatePaymentIntentRequest {
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("amount", self.amount.to_string()),
            ("currency", self.currency.clone()),
            ("description", self.description.clone()),
        ];
        fields.extend(
            self.payment_method_types
                .iter()
                .map(|ty| ("payment_method_types[]", ty.as_str().to_string())),
        );
        fields
    }
}
