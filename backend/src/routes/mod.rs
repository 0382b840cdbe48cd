pub mod admin;
pub mod auth;
pub mod download;
pub mod health;
pub mod paa;

use serde::de::DeserializeOwned;

use crate::error::GateError;

/// Deserialize a request body that has already been read as JSON.
/// Shape errors become 400 responses in the standard envelope instead of
/// the extractor's default rejection.
pub(crate) fn parse_body<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, GateError> {
    serde_json::from_value(value)
        .map_err(|e| GateError::Validation(format!("Invalid request body: {}", e)))
}
