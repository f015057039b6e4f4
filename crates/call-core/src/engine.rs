//! SIP engine adapter interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CallSyncResult;
use crate::types::LifecycleState;

/// Protocol action issued by the reconciler, used in logs and failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolAction {
    Accept,
    Terminate,
    /// Cancel an outgoing call that has not been answered yet
    Decline,
    SetMute,
    SetHold,
    SetAudioSession,
}

impl ProtocolAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolAction::Accept => "accept",
            ProtocolAction::Terminate => "terminate",
            ProtocolAction::Decline => "decline",
            ProtocolAction::SetMute => "set_mute",
            ProtocolAction::SetHold => "set_hold",
            ProtocolAction::SetAudioSession => "set_audio_session",
        }
    }
}

impl std::fmt::Display for ProtocolAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter over the engine's single current call
///
/// Actions are synchronous-but-fast on the engine side; implementations must
/// not block for unbounded time.
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// Accept the incoming call
    async fn accept(&self) -> CallSyncResult<()>;

    /// Hang up an established call or reject an incoming one (BYE / 603)
    async fn terminate(&self) -> CallSyncResult<()>;

    /// Cancel an outgoing call still ringing at the remote (CANCEL)
    async fn decline(&self) -> CallSyncResult<()>;

    /// Mute or unmute the microphone
    async fn set_mute(&self, muted: bool) -> CallSyncResult<()>;

    /// Pause or resume the call
    async fn set_hold(&self, on_hold: bool) -> CallSyncResult<()>;

    /// The OS granted or revoked the audio session; gates RTP streaming
    async fn set_audio_session_active(&self, active: bool) -> CallSyncResult<()>;

    /// Current state of the engine's call, `Idle` if there is none
    fn current_state(&self) -> LifecycleState;
}
