//! Unified error handling for vaclink.
//!
//! One error type shared by the protocol and session crates, so that a
//! failure anywhere in the relay/broker plumbing flows through a single
//! `Result` alias.

/// Unified error type for vaclink.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Network-level failure talking to the relay (DNS, TLS, connect,
    /// HTTP timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed wire payload tied to a specific request. Unsolicited
    /// broadcasts never produce this; they decode to an "unknown" event.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Non-success envelope from the relay. The vendor code and message
    /// are preserved verbatim so callers can match on vendor semantics.
    #[error("Relay failure code {code} ({message})")]
    Relay { code: String, message: String },

    /// Broker went offline, disconnected us or failed to connect. Surfaced
    /// as a session-level notification, never tied to one command.
    #[error("Broker error: {0}")]
    Broker(String),

    /// No result ever arrived for a pending command.
    #[error("Correlation timeout: {0}")]
    CorrelationTimeout(String),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Internal(e.to_string())
    }
}

// Convenience constructors for common errors
impl Error {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn relay(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Relay {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn broker(msg: impl Into<String>) -> Self {
        Self::Broker(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn correlation_timeout(msg: impl Into<String>) -> Self {
        Self::CorrelationTimeout(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_error_keeps_vendor_code_and_message() {
        let err = Error::relay("1024", "no such device");
        assert_eq!(err.to_string(), "Relay failure code 1024 (no such device)");
    }

    #[test]
    fn json_error_converts_to_serialization() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = bad.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
