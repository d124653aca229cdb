use core::fmt;

use skybridge_channel::ChannelError;
use skybridge_hal::ChildContextError;

/// Gate failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateError {
    /// Failure on the bridge or a popup channel
    Channel(ChannelError),
    /// Child context could not be created (popup blocked, no document)
    ChildContext(ChildContextError),
    /// Router or connector reported an outcome other than success or closed
    ProviderSelection(String),
    /// Interface call without a connected provider
    NotConnected,
    /// Connected provider without a cached interface descriptor
    InterfaceMissing { method: String },
    /// Connecting requires a loaded provider
    ProviderNotLoaded,
    /// The loaded provider's metadata cannot build a connector launch
    ConnectorMetadataMissing { provider: String },
    /// Operation issued before `start()`
    NotStarted,
    /// The bridge answered with a value of the wrong shape
    InvalidResponse(String),
    InvalidUrl(String),
    InvalidConfig(String),
}

/// Coarse classification of a [`GateError`], used to pick a UI state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bridge never completed its handshake
    Handshake,
    /// The channel was torn down
    Closed,
    /// A remote rejected the operation
    Remote,
    Transport,
    ChildContext,
    ProviderSelection,
    /// Operation not valid in the current provider or bridge state
    State,
    /// Malformed data from a remote
    Protocol,
    Configuration,
}

impl GateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::Channel(ChannelError::Handshake { .. }) => ErrorKind::Handshake,
            GateError::Channel(ChannelError::Closed) => ErrorKind::Closed,
            GateError::Channel(ChannelError::Remote(_)) => ErrorKind::Remote,
            GateError::Channel(ChannelError::Transport(_)) => ErrorKind::Transport,
            GateError::Channel(ChannelError::Decode(_)) => ErrorKind::Protocol,
            GateError::ChildContext(_) => ErrorKind::ChildContext,
            GateError::ProviderSelection(_) => ErrorKind::ProviderSelection,
            GateError::NotConnected
            | GateError::InterfaceMissing { .. }
            | GateError::ProviderNotLoaded
            | GateError::ConnectorMetadataMissing { .. }
            | GateError::NotStarted => ErrorKind::State,
            GateError::InvalidResponse(_) => ErrorKind::Protocol,
            GateError::InvalidUrl(_) | GateError::InvalidConfig(_) => ErrorKind::Configuration,
        }
    }
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::Channel(e) => write!(f, "{}", e),
            GateError::ChildContext(e) => write!(f, "{}", e),
            GateError::ProviderSelection(msg) => write!(f, "{}", msg),
            GateError::NotConnected => write!(f, "Provider not connected, cannot access interface"),
            GateError::InterfaceMissing { method } => write!(
                f,
                "Provider interface not present despite being connected, cannot call '{}'",
                method
            ),
            GateError::ProviderNotLoaded => write!(f, "No provider loaded, cannot connect"),
            GateError::ConnectorMetadataMissing { provider } => write!(
                f,
                "Provider '{}' does not describe its connector, cannot connect",
                provider
            ),
            GateError::NotStarted => write!(f, "Bridge not started"),
            GateError::InvalidResponse(msg) => write!(f, "Invalid response from bridge: {}", msg),
            GateError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            GateError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for GateError {}

impl From<ChannelError> for GateError {
    fn from(e: ChannelError) -> Self {
        GateError::Channel(e)
    }
}

impl From<ChildContextError> for GateError {
    fn from(e: ChildContextError) -> Self {
        GateError::ChildContext(e)
    }
}
