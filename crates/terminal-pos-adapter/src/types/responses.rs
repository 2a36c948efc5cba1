/*
[INPUT]:  Backend endpoint response schemas
[OUTPUT]: Typed Rust response structs with serialization support
[POS]:    Data layer - type definitions for backend communication
[UPDATE]: When backend response format changes
*/

use serde::{Deserialize, Serialize};

use super::models::Location;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionToken {
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationsResponse(pub Vec<Location>);
