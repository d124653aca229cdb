//! Skybridge Gate
//!
//! The gate owns the long-lived bridge frame and negotiates providers with
//! it:
//!
//! ```text
//!   Uninitialized --start()--> Connecting --handshake--> Ready(ProviderStatus)
//!                                  |                        |
//!                                  +--> Failed              +--destroy_bridge()--> Destroyed
//!                                                                                   |
//!                                                           start() <---------------+
//! ```
//!
//! `Ready` follows the cached [`ProviderStatus`]: not loaded, loaded or
//! connected. Loading a new provider goes through the bridge's router popup,
//! connecting one may go through the provider's connector popup. A popup the
//! user closes is a normal outcome and leaves the status unchanged.

pub mod constants;

mod config;
mod error;
mod gate;
mod negotiate;
mod status;
mod types;

pub use config::GateConfig;
pub use error::{ErrorKind, GateError};
pub use gate::{connector_url, Gate, GatePhase};
pub use negotiate::PopupOutcome;
pub use status::ProviderStatus;
pub use types::{
    BridgeMetadata, ConnectorLaunch, ParameterDescriptor, ProviderInterface, ProviderMetadata,
    SkappInfo,
};

pub use skybridge_channel::{ChannelError, HandshakeOptions};
