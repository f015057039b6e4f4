//! Error types for call-state reconciliation

use thiserror::Error;

use crate::types::CallToken;

/// Result type for call-core operations
pub type CallSyncResult<T> = Result<T, CallSyncError>;

/// Errors produced by the reconciler and its collaborators
///
/// Collaborator traits ([`TelephonyReporter`](crate::TelephonyReporter),
/// [`ProtocolEngine`](crate::ProtocolEngine),
/// [`AudioSessionController`](crate::AudioSessionController)) return these so
/// the reconciler can classify a failure without knowing the platform behind it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallSyncError {
    /// The OS telephony subsystem rejected a report or transaction
    #[error("Telephony reporting failed during {operation}: {reason}")]
    Reporting { operation: String, reason: String },

    /// A SIP engine action (accept, terminate, ...) failed
    #[error("Protocol action {action} failed: {reason}")]
    ProtocolAction { action: String, reason: String },

    /// Configuring or activating the audio session failed
    #[error("Audio session error: {reason}")]
    AudioConfiguration { reason: String },

    /// A call is already ringing or active
    #[error("Call {token} is already in progress")]
    CallInProgress { token: CallToken },

    /// No session exists for the requested operation
    #[error("No active call")]
    NoActiveCall,

    /// The session is not in a state that allows the operation
    #[error("Invalid call state: {message}")]
    InvalidState { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The reconciler task is no longer running
    #[error("Reconciler stopped")]
    ReconcilerStopped,
}

impl CallSyncError {
    /// Create a reporting error
    pub fn reporting(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Reporting {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a protocol action error
    pub fn protocol(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProtocolAction {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create an audio configuration error
    pub fn audio(reason: impl Into<String>) -> Self {
        Self::AudioConfiguration {
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
