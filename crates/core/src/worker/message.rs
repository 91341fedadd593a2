//! Control messages posted by pages to the worker.

use serde::{Deserialize, Serialize};

use crate::Error;

/// A recognized control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting worker now instead of after every session closes.
    SkipWaiting,
}

impl ControlMessage {
    /// Decode a message payload; any other shape is rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value.clone()).map_err(|_| Error::UnknownMessage(value.to_string()))
    }
}
