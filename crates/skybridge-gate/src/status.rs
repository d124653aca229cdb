//! Provider status snapshot
//!
//! The bridge reports status as four flat fields. Only three combinations
//! are meaningful, so the status is held as a tagged union and every other
//! combination is rejected while decoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GateError;
use crate::types::{ProviderInterface, ProviderMetadata};

/// Immutable snapshot of the provider state inside the bridge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireStatus", into = "WireStatus")]
pub enum ProviderStatus {
    #[default]
    NotLoaded,
    Loaded {
        metadata: ProviderMetadata,
    },
    Connected {
        metadata: ProviderMetadata,
        interface: ProviderInterface,
    },
}

impl ProviderStatus {
    /// Decode a status returned by the bridge.
    pub fn from_value(value: Value) -> Result<Self, GateError> {
        serde_json::from_value(value).map_err(|e| GateError::InvalidResponse(e.to_string()))
    }

    pub fn is_provider_loaded(&self) -> bool {
        !matches!(self, ProviderStatus::NotLoaded)
    }

    pub fn is_provider_connected(&self) -> bool {
        matches!(self, ProviderStatus::Connected { .. })
    }

    pub fn metadata(&self) -> Option<&ProviderMetadata> {
        match self {
            ProviderStatus::NotLoaded => None,
            ProviderStatus::Loaded { metadata } | ProviderStatus::Connected { metadata, .. } => {
                Some(metadata)
            }
        }
    }

    pub fn provider_interface(&self) -> Option<&ProviderInterface> {
        match self {
            ProviderStatus::Connected { interface, .. } => Some(interface),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStatus {
    #[serde(default)]
    is_provider_loaded: bool,
    #[serde(default)]
    is_provider_connected: bool,
    #[serde(default)]
    provider_interface: Option<ProviderInterface>,
    #[serde(default)]
    metadata: Option<ProviderMetadata>,
}

impl TryFrom<WireStatus> for ProviderStatus {
    type Error = String;

    fn try_from(wire: WireStatus) -> Result<Self, Self::Error> {
        match (wire.is_provider_loaded, wire.is_provider_connected) {
            (false, false) => Ok(ProviderStatus::NotLoaded),
            (false, true) => Err("provider connected but not loaded".to_string()),
            (true, connected) => {
                let metadata = wire
                    .metadata
                    .ok_or_else(|| "provider loaded without metadata".to_string())?;
                if !connected {
                    return Ok(ProviderStatus::Loaded { metadata });
                }
                let interface = wire
                    .provider_interface
                    .ok_or_else(|| "provider connected without interface".to_string())?;
                Ok(ProviderStatus::Connected {
                    metadata,
                    interface,
                })
            }
        }
    }
}

impl From<ProviderStatus> for WireStatus {
    fn from(status: ProviderStatus) -> Self {
        match status {
            ProviderStatus::NotLoaded => WireStatus::default(),
            ProviderStatus::Loaded { metadata } => WireStatus {
                is_provider_loaded: true,
                metadata: Some(metadata),
                ..WireStatus::default()
            },
            ProviderStatus::Connected {
                metadata,
                interface,
            } => WireStatus {
                is_provider_loaded: true,
                is_provider_connected: true,
                provider_interface: Some(interface),
                metadata: Some(metadata),
            },
        }
    }
}
