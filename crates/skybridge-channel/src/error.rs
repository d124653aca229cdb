use core::fmt;

use skybridge_hal::TransportError;

/// Channel failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelError {
    /// The remote never answered the handshake
    Handshake { attempts: u32 },
    /// The channel was closed before or during the operation
    Closed,
    /// The remote rejected the call; carries its message verbatim
    Remote(String),
    /// The message could not be handed to the platform
    Transport(String),
    /// The remote answered with something that is not a valid message
    Decode(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Handshake { attempts } => {
                write!(
                    f,
                    "Handshake failed, reached maximum number of attempts ({})",
                    attempts
                )
            }
            ChannelError::Closed => write!(f, "Channel closed"),
            ChannelError::Remote(msg) => write!(f, "{}", msg),
            ChannelError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ChannelError::Decode(msg) => write!(f, "Malformed message: {}", msg),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<TransportError> for ChannelError {
    fn from(e: TransportError) -> Self {
        ChannelError::Transport(e.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_displays_raw_message() {
        let err = ChannelError::Remote("Error: provider refused".to_string());
        assert_eq!(err.to_string(), "Error: provider refused");
    }

    #[test]
    fn test_handshake_error_display() {
        let err = ChannelError::Handshake { attempts: 5 };
        assert_eq!(
            err.to_string(),
            "Handshake failed, reached maximum number of attempts (5)"
        );
    }
}
