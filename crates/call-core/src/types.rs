//! Session model shared by the reconciler and its collaborators
//!
//! Two state machines meet here:
//!
//! - [`LifecycleState`] is the SIP engine's fine-grained call state, exactly as
//!   the engine reports it.
//! - [`CallPhase`] is the reconciler's collapsed view of the same call, the one
//!   the OS call UI is kept in agreement with.
//!
//! ```text
//! NoCall ──report──► Ringing{In|Out} ──answer/connected──► Active
//!    ▲                    │                                  │
//!    │                    └──────────end intent──────────────┤
//!    │                                                       ▼
//!    └───────────────engine End/Released/Error────────── Ending
//! ```
//!
//! `NoCall` is represented by the absence of a [`CallSession`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier shared with the OS telephony subsystem for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallToken(pub Uuid);

impl CallToken {
    /// Allocate a fresh token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CallToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a call relative to the local user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallDirection {
    /// Remote party called us
    Incoming,
    /// We called the remote party
    Outgoing,
}

/// Call state as reported by the SIP engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// No call object yet
    Idle,
    /// An INVITE was received
    IncomingReceived,
    /// A push notification announced an incoming call before its INVITE
    PushIncomingReceived,
    /// First state an outgoing call goes through
    OutgoingInit,
    /// The INVITE was sent and is being processed
    OutgoingProgress,
    /// Remote is ringing (180)
    OutgoingRinging,
    /// Call answered, media not flowing yet
    Connected,
    /// Media streams are running
    StreamsRunning,
    /// We put the call on hold
    Paused,
    /// The remote put the call on hold
    PausedByRemote,
    /// We requested a call update (re-INVITE)
    Updating,
    /// The remote updated the call
    UpdatedByRemote,
    /// Call is being torn down
    Ending,
    /// Call ended
    End,
    /// Call object released by the engine
    Released,
    /// Call failed
    Error,
}

impl LifecycleState {
    /// Ordering rank used for the monotonicity check
    ///
    /// The mid-call states share one rank so that they can oscillate freely
    /// (hold/resume, re-INVITEs).
    fn rank(&self) -> u8 {
        match self {
            LifecycleState::Idle => 0,
            LifecycleState::IncomingReceived
            | LifecycleState::PushIncomingReceived
            | LifecycleState::OutgoingInit => 1,
            LifecycleState::OutgoingProgress => 2,
            LifecycleState::OutgoingRinging => 3,
            LifecycleState::Connected => 4,
            LifecycleState::StreamsRunning
            | LifecycleState::Paused
            | LifecycleState::PausedByRemote
            | LifecycleState::Updating
            | LifecycleState::UpdatedByRemote => 5,
            LifecycleState::Ending => 6,
            LifecycleState::End | LifecycleState::Error => 7,
            LifecycleState::Released => 8,
        }
    }

    /// Whether the engine considers the call finished
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::End | LifecycleState::Released | LifecycleState::Error
        )
    }

    /// Whether the call is established and in the hold/resume group
    pub fn is_mid_call(&self) -> bool {
        self.rank() == 5
    }

    /// Whether a transition from `self` to `next` respects monotonic ordering
    pub fn can_advance_to(&self, next: LifecycleState) -> bool {
        let (from, to) = (self.rank(), next.rank());
        to > from || (from == 5 && to == 5)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Reconciler's collapsed view of a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallPhase {
    /// Reported to the OS, not answered yet
    Ringing(CallDirection),
    /// Answered and running
    Active,
    /// OS record released, waiting for the engine to confirm the end
    Ending,
}

/// A single call as tracked by the reconciler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    /// Token shared with the OS telephony subsystem
    pub token: CallToken,
    /// Call direction
    pub direction: CallDirection,
    /// Last state reported by the engine
    pub lifecycle: LifecycleState,
    /// Reconciler phase
    pub phase: CallPhase,
    /// Remote party handle shown in the OS call UI
    pub remote_handle: String,
    /// Whether media is running for this call
    pub is_running: bool,
    /// Whether the call is an unanswered incoming call
    pub is_incoming: bool,
    /// Whether the microphone is muted for this call
    pub is_muted: bool,
    /// Whether the call is on hold
    pub is_on_hold: bool,
    /// A terminate/decline was already issued for this session
    pub end_issued: bool,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session became active
    pub connected_at: Option<DateTime<Utc>>,
}

impl CallSession {
    /// Session for a call the engine just received
    pub fn incoming(token: CallToken, remote_handle: impl Into<String>, lifecycle: LifecycleState) -> Self {
        Self::new(token, CallDirection::Incoming, remote_handle.into(), lifecycle)
    }

    /// Session for a call we are placing
    pub fn outgoing(token: CallToken, remote_handle: impl Into<String>, lifecycle: LifecycleState) -> Self {
        Self::new(token, CallDirection::Outgoing, remote_handle.into(), lifecycle)
    }

    fn new(token: CallToken, direction: CallDirection, remote_handle: String, lifecycle: LifecycleState) -> Self {
        Self {
            token,
            direction,
            lifecycle,
            phase: CallPhase::Ringing(direction),
            remote_handle,
            is_running: false,
            is_incoming: direction == CallDirection::Incoming,
            is_muted: false,
            is_on_hold: false,
            end_issued: false,
            created_at: Utc::now(),
            connected_at: None,
        }
    }

    /// Ringing or active, i.e. occupying the single call slot
    pub fn is_live(&self) -> bool {
        self.phase != CallPhase::Ending
    }

    /// Record an engine state if it does not move the session backwards
    ///
    /// Returns `false` when the update was ignored.
    pub fn advance_lifecycle(&mut self, next: LifecycleState) -> bool {
        if self.lifecycle.can_advance_to(next) {
            self.lifecycle = next;
            true
        } else {
            false
        }
    }

    /// Mark the session answered
    pub fn mark_active(&mut self) {
        self.phase = CallPhase::Active;
        self.is_running = true;
        self.is_incoming = false;
        if self.connected_at.is_none() {
            self.connected_at = Some(Utc::now());
        }
    }

    /// Clear the running flags once the call is over for the OS
    pub fn clear_flags(&mut self) {
        self.is_running = false;
        self.is_incoming = false;
    }
}
