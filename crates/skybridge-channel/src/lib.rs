//! Connection channel to a Skybridge child context
//!
//! A [`Connection`] wraps the raw [`Messenger`](skybridge_hal::Messenger) of
//! one child context (the bridge frame, a router or a connector popup) and
//! layers a small protocol on top of it:
//!
//! - **Handshake**: bounded retry until the remote script answers
//! - **Calls**: request/response matched by request id, any number in flight
//! - **Events**: remote-pushed notifications, persistent or one-shot
//!
//! All messages are JSON objects tagged by `type`, see [`Envelope`].

mod connection;
mod error;
mod protocol;

use serde::{Deserialize, Serialize};

pub use connection::{Connection, EventFuture, ListenerId};
pub use error::ChannelError;
pub use protocol::Envelope;

/// Default number of handshake attempts
pub const DEFAULT_HANDSHAKE_ATTEMPTS: u32 = 5;

/// Default delay between handshake attempts (ms)
pub const DEFAULT_HANDSHAKE_INTERVAL_MS: u32 = 100;

/// Handshake retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HandshakeOptions {
    /// Attempts before giving up with [`ChannelError::Handshake`]
    pub max_attempts: u32,
    /// Time to wait for a response before the next attempt
    pub retry_interval_ms: u32,
}

impl Default for HandshakeOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_HANDSHAKE_ATTEMPTS,
            retry_interval_ms: DEFAULT_HANDSHAKE_INTERVAL_MS,
        }
    }
}
