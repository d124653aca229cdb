//! Platform Abstraction Layer for Skybridge
//!
//! This crate defines the traits that let the bridge client run against
//! different hosts by abstracting the few primitives it needs from the page:
//!
//! - **Child contexts**: an invisible embedded frame for the bridge, and
//!   centered popup windows for the router and connector UIs
//! - **Messengers**: a bidirectional message pipe to a child context
//! - **Timers**: a cooperative sleep used for handshake retries and popup polling
//! - **Debug output**: a console sink used for all client logging
//!
//! # Platform Implementations
//!
//! - **Browser**: `skybridge-web` (iframes, `window.open`, `postMessage`, `setTimeout`)
//! - **Tests**: `skybridge-hal-mock` (scripted in-memory remotes, virtual clock)
//!
//! Everything is single-threaded: futures returned here are `!Send` and
//! handles are shared through `Rc`, matching the browser's event loop.

pub mod geometry;
pub mod urls;

use core::fmt;

use futures::future::LocalBoxFuture;
use serde_json::Value;

pub use geometry::{PopupGeometry, ScreenMetrics};
pub use urls::{ensure_scheme, join_url};

/// Callback invoked for every message a messenger receives from its remote.
pub type MessageHandler = Box<dyn FnMut(Value)>;

// =============================================================================
// Messenger
// =============================================================================

/// A raw message pipe between the host page and one child context.
///
/// Messengers carry JSON values and know nothing about requests, responses
/// or handshakes; that protocol lives in `skybridge-channel`.
pub trait Messenger: 'static {
    /// Send a message to the remote context.
    ///
    /// # Returns
    /// * `Ok(())` - Message handed to the platform
    /// * `Err(TransportError)` - Remote not reachable (e.g. frame not attached yet)
    fn post(&self, message: Value) -> Result<(), TransportError>;

    /// Register the handler receiving every message from the remote.
    ///
    /// Replaces any previously registered handler.
    fn listen(&self, handler: MessageHandler);

    /// Stop delivering messages and release the platform listener.
    fn stop(&self);
}

// =============================================================================
// Child contexts
// =============================================================================

/// Creates and tears down sandboxed child execution contexts.
pub trait ChildContextFactory {
    /// Handle to a child context (embedded frame or popup window)
    type Child: Clone + fmt::Debug + 'static;

    /// Messenger attached to a child context
    type Messenger: Messenger;

    /// Create an invisible, page-embedded context pointed at `url`.
    ///
    /// `name` is the frame name other windows use to locate the context.
    fn open_embedded(&self, url: &str, name: &str) -> Result<Self::Child, ChildContextError>;

    /// Create a user-visible popup centered on the current window.
    ///
    /// # Returns
    /// * `Ok(Child)` - Handle to the new window
    /// * `Err(ChildContextError::Blocked)` - Window creation blocked (popup blocker)
    fn open_popup(
        &self,
        url: &str,
        title: &str,
        width: u32,
        height: u32,
    ) -> Result<Self::Child, ChildContextError>;

    /// Remove an embedded context from the page, or close a popup window.
    fn remove_child(&self, child: &Self::Child);

    /// Whether the context has gone away (popup dismissed, frame detached).
    fn is_closed(&self, child: &Self::Child) -> bool;

    /// Attach a messenger to a child context.
    fn messenger(&self, child: &Self::Child) -> Result<Self::Messenger, ChildContextError>;
}

// =============================================================================
// Platform
// =============================================================================

/// Everything the bridge client needs from its host.
pub trait Platform: ChildContextFactory + 'static {
    /// Resolve after roughly `millis` milliseconds.
    ///
    /// On the browser: `setTimeout`. Never blocks the event loop.
    fn sleep(&self, millis: u32) -> LocalBoxFuture<'static, ()>;

    /// Write a debug message to the platform's console/log
    ///
    /// On the browser: Uses `console.log()`
    fn debug_write(&self, msg: &str);
}

// =============================================================================
// Errors
// =============================================================================

/// Failure to create or reach a child context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChildContextError {
    /// Window creation was blocked (typically by a popup blocker)
    Blocked,
    /// The host cannot create the context (no document, no body, ...)
    Unavailable(String),
}

impl fmt::Display for ChildContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildContextError::Blocked => {
                write!(f, "Could not open window, it may have been blocked by the browser")
            }
            ChildContextError::Unavailable(msg) => write!(f, "Child context unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ChildContextError {}

/// Failure to hand a message to the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport error: {}", self.0)
    }
}

impl std::error::Error for TransportError {}
