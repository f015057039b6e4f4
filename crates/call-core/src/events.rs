//! Event channel for application observers
//!
//! Everything the reconciler wants the outside world to know goes through a
//! single broadcast channel of [`SyncEvent`]s:
//!
//! - **Call events** - the named events the application layer listens to
//!   (`CallRinging`, `CallEnd`, ...), one per engine notification
//! - **Session events** - snapshots of the reconciled session and its removal
//! - **Failures** - structured [`FailureReport`]s for every swallowed error
//!
//! # Event names
//!
//! Application callbacks are registered under names such as `onCallRinging`.
//! The event name is the callback name without its two-character prefix:
//!
//! ```rust
//! use leenphone_call_core::events::CallEventKind;
//!
//! assert_eq!(CallEventKind::from_callback_name("onCallRinging"), Some(CallEventKind::CallRinging));
//! assert_eq!(CallEventKind::SignalQualityChange.name(), "SignalQualityChange");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::intent::RegistrationState;
use crate::types::{CallSession, CallToken, LifecycleState};

/// Length of the callback-name prefix (`on`) stripped to obtain event names
pub const CALLBACK_PREFIX_LEN: usize = 2;

/// Names of the events forwarded to application observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallEventKind {
    ConnectionRequested,
    CallRequested,
    CallRinging,
    CallConnected,
    CallStreamsRunning,
    CallPaused,
    CallPausedByRemote,
    CallUpdating,
    CallUpdatedByRemote,
    CallReleased,
    CallError,
    CallEnd,
    CallPushIncomingReceived,
    AccountRegistrationStateChanged,
    IncomingReceived,
    AudioDevicesChanged,
    SignalQualityChange,
}

impl CallEventKind {
    /// Every event kind, in declaration order
    pub const ALL: [CallEventKind; 17] = [
        CallEventKind::ConnectionRequested,
        CallEventKind::CallRequested,
        CallEventKind::CallRinging,
        CallEventKind::CallConnected,
        CallEventKind::CallStreamsRunning,
        CallEventKind::CallPaused,
        CallEventKind::CallPausedByRemote,
        CallEventKind::CallUpdating,
        CallEventKind::CallUpdatedByRemote,
        CallEventKind::CallReleased,
        CallEventKind::CallError,
        CallEventKind::CallEnd,
        CallEventKind::CallPushIncomingReceived,
        CallEventKind::AccountRegistrationStateChanged,
        CallEventKind::IncomingReceived,
        CallEventKind::AudioDevicesChanged,
        CallEventKind::SignalQualityChange,
    ];

    /// Event name as seen by the application layer
    pub fn name(&self) -> &'static str {
        match self {
            CallEventKind::ConnectionRequested => "ConnectionRequested",
            CallEventKind::CallRequested => "CallRequested",
            CallEventKind::CallRinging => "CallRinging",
            CallEventKind::CallConnected => "CallConnected",
            CallEventKind::CallStreamsRunning => "CallStreamsRunning",
            CallEventKind::CallPaused => "CallPaused",
            CallEventKind::CallPausedByRemote => "CallPausedByRemote",
            CallEventKind::CallUpdating => "CallUpdating",
            CallEventKind::CallUpdatedByRemote => "CallUpdatedByRemote",
            CallEventKind::CallReleased => "CallReleased",
            CallEventKind::CallError => "CallError",
            CallEventKind::CallEnd => "CallEnd",
            CallEventKind::CallPushIncomingReceived => "CallPushIncomingReceived",
            CallEventKind::AccountRegistrationStateChanged => "AccountRegistrationStateChanged",
            CallEventKind::IncomingReceived => "IncomingReceived",
            CallEventKind::AudioDevicesChanged => "AudioDevicesChanged",
            CallEventKind::SignalQualityChange => "SignalQualityChange",
        }
    }

    /// Look up an event by its name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Look up an event by application callback name (`onCallEnd` -> `CallEnd`)
    pub fn from_callback_name(callback: &str) -> Option<Self> {
        callback.get(CALLBACK_PREFIX_LEN..).and_then(Self::from_name)
    }

    /// Event emitted for an engine call state, if any
    pub fn for_lifecycle(state: LifecycleState) -> Option<Self> {
        let kind = match state {
            LifecycleState::IncomingReceived => CallEventKind::IncomingReceived,
            LifecycleState::PushIncomingReceived => CallEventKind::CallPushIncomingReceived,
            LifecycleState::OutgoingInit => CallEventKind::ConnectionRequested,
            LifecycleState::OutgoingProgress => CallEventKind::CallRequested,
            LifecycleState::OutgoingRinging => CallEventKind::CallRinging,
            LifecycleState::Connected => CallEventKind::CallConnected,
            LifecycleState::StreamsRunning => CallEventKind::CallStreamsRunning,
            LifecycleState::Paused => CallEventKind::CallPaused,
            LifecycleState::PausedByRemote => CallEventKind::CallPausedByRemote,
            LifecycleState::Updating => CallEventKind::CallUpdating,
            LifecycleState::UpdatedByRemote => CallEventKind::CallUpdatedByRemote,
            LifecycleState::Released => CallEventKind::CallReleased,
            LifecycleState::Error => CallEventKind::CallError,
            LifecycleState::End => CallEventKind::CallEnd,
            LifecycleState::Idle | LifecycleState::Ending => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for CallEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Named event with its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEvent {
    pub kind: CallEventKind,
    pub payload: CallEventPayload,
    pub timestamp: DateTime<Utc>,
}

/// Payload carried by a [`CallEvent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallEventPayload {
    /// No payload
    None,
    /// Call state change message from the engine
    Call {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        remote_handle: Option<String>,
    },
    /// Registration update
    Registration { state: RegistrationState, message: String },
    /// Signal quality update
    Quality { quality: f32 },
}

impl CallEvent {
    pub fn new(kind: CallEventKind, payload: CallEventPayload) -> Self {
        Self {
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Category of a swallowed failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The OS telephony subsystem rejected a report or transaction
    Reporting,
    /// A SIP engine action failed
    ProtocolAction,
    /// Audio session configuration or activation failed
    AudioConfiguration,
}

/// Structured record of an error the reconciler logged instead of propagating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: FailureKind,
    /// Call the failure relates to, if any
    pub token: Option<CallToken>,
    /// Operation that failed (e.g. "accept", "report_ended")
    pub operation: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl FailureReport {
    pub fn new(kind: FailureKind, token: Option<CallToken>, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            token,
            operation: operation.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything published on the reconciler's event channel
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Named event for application observers
    Call(CallEvent),
    /// The reconciled session changed
    SessionUpdated(CallSession),
    /// The session was destroyed
    SessionClosed { token: CallToken, reason: String },
    /// An error was handled inline
    Failure(FailureReport),
}

/// Event stream type
pub type EventStream = BroadcastStream<SyncEvent>;

/// Simple event iterator that doesn't require StreamExt
pub struct EventIterator {
    stream: EventStream,
}

impl EventIterator {
    pub fn new(stream: EventStream) -> Self {
        Self { stream }
    }

    /// Get the next event, skipping over lagged notifications
    pub async fn next(&mut self) -> Option<SyncEvent> {
        use tokio_stream::StreamExt;
        loop {
            match self.stream.next().await {
                Some(Ok(event)) => return Some(event),
                Some(Err(_lagged)) => continue,
                None => return None,
            }
        }
    }
}

/// Broadcast emitter shared by the reconciler and the bridge
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventEmitter {
    /// Create a new event emitter with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event
    pub fn emit(&self, event: SyncEvent) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events as a stream
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Subscribe to events with a simple iterator
    pub fn subscribe_simple(&self) -> EventIterator {
        EventIterator::new(self.subscribe())
    }

    /// Raw receiver, for consumers that poll with `try_recv`
    pub fn receiver(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_prefix_is_stripped() {
        for kind in CallEventKind::ALL {
            let callback = format!("on{}", kind.name());
            assert_eq!(CallEventKind::from_callback_name(&callback), Some(kind));
        }
        assert_eq!(CallEventKind::from_callback_name("on"), None);
        assert_eq!(CallEventKind::from_callback_name("x"), None);
        assert_eq!(CallEventKind::from_callback_name("onSomethingElse"), None);
    }

    #[test]
    fn test_lifecycle_event_mapping() {
        assert_eq!(CallEventKind::for_lifecycle(LifecycleState::OutgoingInit), Some(CallEventKind::ConnectionRequested));
        assert_eq!(CallEventKind::for_lifecycle(LifecycleState::OutgoingProgress), Some(CallEventKind::CallRequested));
        assert_eq!(CallEventKind::for_lifecycle(LifecycleState::End), Some(CallEventKind::CallEnd));
        assert_eq!(CallEventKind::for_lifecycle(LifecycleState::Released), Some(CallEventKind::CallReleased));
        assert_eq!(CallEventKind::for_lifecycle(LifecycleState::Idle), None);
        assert_eq!(CallEventKind::for_lifecycle(LifecycleState::Ending), None);
    }

    #[tokio::test]
    async fn test_emitter_delivers_to_subscribers() {
        let emitter = EventEmitter::new(8);
        let mut events = emitter.subscribe_simple();
        assert_eq!(emitter.receiver_count(), 1);

        emitter.emit(SyncEvent::Call(CallEvent::new(CallEventKind::CallEnd, CallEventPayload::None)));

        match events.next().await {
            Some(SyncEvent::Call(event)) => assert_eq!(event.name(), "CallEnd"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
