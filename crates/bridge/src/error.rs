//! Error types for the SIP module

use leenphone_call_core::CallSyncError;
use thiserror::Error;

use crate::devices::AudioRoute;

/// Result type for SIP module operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors returned to the application layer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    /// Call state reconciliation error
    #[error("Call error: {0}")]
    Core(#[from] CallSyncError),

    /// An operation was called before `initialise`
    #[error("SIP module not initialised")]
    NotInitialised,

    /// `initialise` was called twice
    #[error("SIP module already initialised")]
    AlreadyInitialised,

    /// Argument rejected before reaching the engine
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },

    /// The SIP engine refused an operation
    #[error("Engine error in {operation}: {message}")]
    Engine { operation: String, message: String },

    /// No playback device serves the requested route
    #[error("No audio device available for route {route}")]
    NoAudioRoute { route: AudioRoute },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl BridgeError {
    /// Create an invalid argument error
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an engine error
    pub fn engine(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Engine {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
