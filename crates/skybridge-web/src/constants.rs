//! DOM names used by the browser platform

/// Event delivering cross-window messages
pub const MESSAGE_EVENT: &str = "message";

/// Fired once the document is parsed and `document.body` exists
pub const DOM_CONTENT_LOADED_EVENT: &str = "DOMContentLoaded";

/// Target origin for `postMessage`.
///
/// Children are loaded from URLs chosen at runtime (bridge, router,
/// provider connector), so messages are not pinned to an origin; incoming
/// messages are filtered by source window instead.
pub const TARGET_ORIGIN: &str = "*";

/// Tag name of the bridge frame element
pub const IFRAME_TAG: &str = "iframe";

/// Prefix for log lines written by this crate
pub const LOG_PREFIX: &str = "[skybridge-web]";
