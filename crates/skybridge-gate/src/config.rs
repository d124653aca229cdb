//! Gate configuration

use serde::{Deserialize, Serialize};
use skybridge_channel::HandshakeOptions;

use crate::constants::DEFAULT_POPUP_POLL_INTERVAL_MS;
use crate::error::GateError;

/// Configuration of a [`Gate`](crate::Gate).
///
/// JavaScript hosts pass it as a camelCase JSON object; everything except
/// `bridgeUrl` is optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    /// Location of the bridge page; a bare host gets `https://`
    pub bridge_url: String,
    #[serde(default)]
    pub handshake: HandshakeOptions,
    /// How often a pending router/connector popup is checked for dismissal
    #[serde(default = "default_popup_poll_interval")]
    pub popup_poll_interval_ms: u32,
}

fn default_popup_poll_interval() -> u32 {
    DEFAULT_POPUP_POLL_INTERVAL_MS
}

impl GateConfig {
    pub fn new(bridge_url: &str) -> Self {
        Self {
            bridge_url: bridge_url.to_string(),
            handshake: HandshakeOptions::default(),
            popup_poll_interval_ms: DEFAULT_POPUP_POLL_INTERVAL_MS,
        }
    }

    /// Parse a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self, GateError> {
        serde_json::from_str(json).map_err(|e| GateError::InvalidConfig(e.to_string()))
    }
}
