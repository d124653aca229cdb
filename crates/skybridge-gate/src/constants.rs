//! Centralized constants for the gate crate
//!
//! Remote method and event names are the bridge protocol's vocabulary and
//! must match the scripts running in the bridge, router and connector.

// =============================================================================
// Bridge methods
// =============================================================================

pub const METHOD_GET_BRIDGE_METADATA: &str = "getBridgeMetadata";
pub const METHOD_CONNECT_PROVIDER: &str = "connectProvider";
pub const METHOD_DISCONNECT_PROVIDER: &str = "disconnectProvider";
pub const METHOD_FETCH_STORED_PROVIDER: &str = "fetchStoredProvider";
pub const METHOD_GET_PROVIDER_STATUS: &str = "getProviderStatus";
pub const METHOD_LOAD_NEW_PROVIDER: &str = "loadNewProvider";
pub const METHOD_UNLOAD_PROVIDER: &str = "unloadProvider";
pub const METHOD_CALL_INTERFACE: &str = "callInterface";

/// Bridge event carrying the final status of a connector negotiation
pub const EVENT_CONNECTION_COMPLETE: &str = "connectionComplete";

// =============================================================================
// Router / connector popups
// =============================================================================

/// Tells a popup which frame hosts the bridge
pub const METHOD_SET_FRAME_NAME: &str = "setFrameName";

/// Popup event carrying the negotiation outcome
pub const EVENT_RESULT: &str = "result";

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_CLOSED: &str = "closed";

// =============================================================================
// Connector launch query parameters
// =============================================================================

pub const QUERY_BRIDGE_FRAME_NAME: &str = "bridgeFrameName";
pub const QUERY_SKAPP_NAME: &str = "skappName";
pub const QUERY_SKAPP_DOMAIN: &str = "skappDomain";

// =============================================================================
// Defaults
// =============================================================================

/// Prefix of the bridge frame name; a fresh uuid follows per session
pub const BRIDGE_FRAME_PREFIX: &str = "skybridge-";

/// Interface method every provider must expose
pub const IDENTITY_METHOD: &str = "identity";

/// Interval between popup liveness checks (ms)
pub const DEFAULT_POPUP_POLL_INTERVAL_MS: u32 = 500;
