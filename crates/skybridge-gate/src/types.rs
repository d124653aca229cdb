//! Values exchanged with the bridge

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Identifies the hosting application to the bridge and providers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkappInfo {
    pub name: String,
    pub domain: String,
}

impl SkappInfo {
    pub fn new(name: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: domain.to_string(),
        }
    }

    /// Argument form passed to bridge methods.
    pub fn to_value(&self) -> Value {
        json!({ "name": self.name, "domain": self.domain })
    }
}

/// Describes a loaded provider and how to launch its connector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    pub name: String,
    #[serde(alias = "domain")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_connector_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_h: Option<u32>,
}

/// Where and how to open a provider's connector popup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectorLaunch<'a> {
    pub path: &'a str,
    pub title: &'a str,
    pub width: u32,
    pub height: u32,
}

impl ProviderMetadata {
    /// Connector launch data, if the provider describes a usable connector.
    ///
    /// An empty path or a zero-sized window counts as missing.
    pub fn connector(&self) -> Option<ConnectorLaunch<'_>> {
        Some(ConnectorLaunch {
            path: self
                .relative_connector_path
                .as_deref()
                .filter(|path| !path.is_empty())?,
            title: self.connector_name.as_deref()?,
            width: self.connector_w.filter(|w| *w > 0)?,
            height: self.connector_h.filter(|h| *h > 0)?,
        })
    }
}

/// One parameter of an interface method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterDescriptor {
    Name(String),
    Typed {
        name: String,
        #[serde(rename = "type", default)]
        ty: String,
        #[serde(default)]
        optional: bool,
    },
}

impl ParameterDescriptor {
    pub fn name(&self) -> &str {
        match self {
            ParameterDescriptor::Name(name) => name,
            ParameterDescriptor::Typed { name, .. } => name,
        }
    }
}

/// Methods a connected provider exposes through `callInterface`.
pub type ProviderInterface = BTreeMap<String, Vec<ParameterDescriptor>>;

/// Static description of the bridge and its router UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeMetadata {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    pub relative_router_url: String,
    #[serde(default)]
    pub router_name: String,
    pub router_w: u32,
    pub router_h: u32,
    #[serde(default)]
    pub minimum_interface: ProviderInterface,
}
