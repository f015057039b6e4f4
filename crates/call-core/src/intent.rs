//! Inputs delivered to the reconciler by the OS and by the SIP engine

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CallToken, LifecycleState};

/// Identifier of one OS action awaiting acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User- or OS-driven call action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TelephonyIntent {
    /// Answer an incoming call
    Answer { token: CallToken },
    /// End or decline a call
    End { token: CallToken },
    /// Put the call on hold or resume it
    Hold { token: CallToken, on_hold: bool },
    /// Mute or unmute the microphone
    Mute { token: CallToken, muted: bool },
    /// The OS accepted our request to start an outgoing call
    StartOutgoing { token: CallToken },
}

impl TelephonyIntent {
    /// Token of the call the intent targets
    pub fn token(&self) -> CallToken {
        match *self {
            TelephonyIntent::Answer { token }
            | TelephonyIntent::End { token }
            | TelephonyIntent::Hold { token, .. }
            | TelephonyIntent::Mute { token, .. }
            | TelephonyIntent::StartOutgoing { token } => token,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            TelephonyIntent::Answer { .. } => "answer",
            TelephonyIntent::End { .. } => "end",
            TelephonyIntent::Hold { .. } => "hold",
            TelephonyIntent::Mute { .. } => "mute",
            TelephonyIntent::StartOutgoing { .. } => "start_outgoing",
        }
    }
}

/// An intent together with the OS action that must be acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: ActionId,
    pub intent: TelephonyIntent,
}

impl PendingAction {
    pub fn new(intent: TelephonyIntent) -> Self {
        Self {
            id: ActionId::new(),
            intent,
        }
    }
}

/// Outcome signalled back to the OS for a [`PendingAction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Acknowledgement {
    /// The action was handled; the OS releases its pending UI state
    Fulfilled,
    /// The action could not apply (unknown call, illegal transition)
    Failed,
}

/// Audio session notifications from the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioSessionEvent {
    Activated,
    Deactivated,
}

/// Account registration state reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationState {
    None,
    Progress,
    Ok,
    Cleared,
    Failed,
}

/// Notifications from the SIP engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// The engine's call changed state
    CallStateChanged {
        state: LifecycleState,
        /// Remote party, present for incoming calls
        remote_handle: Option<String>,
        message: String,
    },
    /// Account registration changed
    RegistrationStateChanged {
        state: RegistrationState,
        message: String,
    },
    /// Audio devices were plugged or unplugged
    AudioDevicesChanged,
    /// Call signal quality changed (0.0 to 5.0)
    SignalQualityChanged { quality: f32 },
}

impl ProtocolEvent {
    /// Shorthand for a call state change without a handle
    pub fn call_state(state: LifecycleState, message: impl Into<String>) -> Self {
        ProtocolEvent::CallStateChanged {
            state,
            remote_handle: None,
            message: message.into(),
        }
    }

    /// Shorthand for an incoming INVITE
    pub fn incoming(remote_handle: impl Into<String>) -> Self {
        ProtocolEvent::CallStateChanged {
            state: LifecycleState::IncomingReceived,
            remote_handle: Some(remote_handle.into()),
            message: "Incoming call".to_string(),
        }
    }
}
