use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::errors::{MonitorError, Result};

/// Opaque JSON payload carried verbatim between the caller and the API
///
/// Used for fields whose shape depends on a sibling `type` discriminator
/// that the vendor keeps open-ended (alert `config`, channel `options`).
/// The JSON text is kept exactly as it was received or encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(Box<RawValue>);

impl RawPayload {
    /// Encode any serializable value into a payload
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::value::to_raw_value(value)
            .map(Self)
            .map_err(MonitorError::Serialize)
    }

    /// Wrap JSON text, checking only that it is valid JSON
    pub fn from_json(json: impl Into<String>) -> Result<Self> {
        RawValue::from_string(json.into())
            .map(Self)
            .map_err(MonitorError::Serialize)
    }

    /// Decode the payload into a concrete shape
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(self.0.get()).map_err(MonitorError::Decode)
    }

    /// The raw JSON text
    pub fn as_json(&self) -> &str {
        self.0.get()
    }
}

impl PartialEq for RawPayload {
    fn eq(&self, other: &Self) -> bool {
        self.as_json() == other.as_json()
    }
}
