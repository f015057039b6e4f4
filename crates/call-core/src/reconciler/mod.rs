//! Call lifecycle reconciler
//!
//! The reconciler is the only component allowed to mutate the call session.
//! It translates OS intents into engine actions and engine events into OS
//! reports, so the native call UI and the SIP engine never disagree about
//! whether a call is alive.
//!
//! # Architecture
//!
//! ```text
//!  OS call UI ──intent──┐                         ┌──report──► OS call UI
//!                       ▼                         │
//!               ┌───────────────────────────────────────┐
//!               │              Reconciler               │
//!               │  dispatch(input) ─► handler(session)  │
//!               └───────────────────────────────────────┘
//!                       │                         ▲
//!  audio session ◄──────┤                         │
//!  SIP engine    ◄──action                      event── SIP engine
//! ```
//!
//! Inputs from both sides are serialized through one queue (see
//! [`ReconcilerHandle`]), so handlers never interleave. Each handler still
//! re-reads the engine's current state before acting instead of trusting the
//! last state it was told about.
//!
//! # Error policy
//!
//! Nothing crosses the OS callback boundary as an error. Every
//! [`PendingAction`] is acknowledged exactly once; failures are logged and
//! published as [`FailureReport`]s. There are no retries.

mod service;

pub use service::{ReconcilerHandle, ReconcilerInput};

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::audio::AudioSessionController;
use crate::config::ProviderConfig;
use crate::engine::{ProtocolAction, ProtocolEngine};
use crate::error::{CallSyncError, CallSyncResult};
use crate::events::{CallEvent, CallEventKind, CallEventPayload, EventEmitter, FailureKind, FailureReport, SyncEvent};
use crate::intent::{Acknowledgement, ActionId, AudioSessionEvent, PendingAction, ProtocolEvent, TelephonyIntent};
use crate::reporter::{CallRequest, TelephonyReporter};
use crate::types::{CallDirection, CallPhase, CallSession, CallToken, LifecycleState};

/// Result of trying to end the engine's call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TerminalOutcome {
    /// terminate/decline was sent and accepted by the engine
    Issued,
    /// A terminal action was already sent for this session
    AlreadyIssued,
    /// The engine's call is already over
    NotNeeded,
    /// The engine rejected the action
    Failed,
}

/// Single authority over the call session
pub struct Reconciler {
    session: Option<CallSession>,
    reporter: Arc<dyn TelephonyReporter>,
    engine: Arc<dyn ProtocolEngine>,
    audio: Arc<dyn AudioSessionController>,
    events: EventEmitter,
    config: ProviderConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("session", &self.session)
            .field("events", &self.events)
            .field("config", &self.config)
            .finish()
    }
}

impl Reconciler {
    /// Create a reconciler over the three collaborators
    ///
    /// Fails if `config` allows more than one call.
    pub fn new(
        config: ProviderConfig,
        reporter: Arc<dyn TelephonyReporter>,
        engine: Arc<dyn ProtocolEngine>,
        audio: Arc<dyn AudioSessionController>,
    ) -> CallSyncResult<Self> {
        config.validate()?;
        let events = EventEmitter::new(config.event_capacity);
        Ok(Self {
            session: None,
            reporter,
            engine,
            audio,
            events,
            config,
        })
    }

    /// Publish on an existing emitter instead of a private one
    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    /// Event channel of this reconciler
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Current session, if any
    pub fn session(&self) -> Option<&CallSession> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    // ===== FORWARD PATH: REPORTS =====

    /// Report a call the engine just received to the OS
    ///
    /// Allocates the session token. The engine already owns the call, so no
    /// protocol action is taken; this only brings up the ringing UI.
    pub async fn report_incoming(&mut self, remote_handle: &str) -> CallSyncResult<CallToken> {
        self.ensure_call_slot_free()?;

        let token = CallToken::new();
        let mut session = CallSession::incoming(token, remote_handle, LifecycleState::IncomingReceived);
        session.advance_lifecycle(self.engine.current_state());
        info!(%token, remote = %remote_handle, "Reporting incoming call");

        self.publish(&session);
        self.session = Some(session);

        let update = self.config.call_update(remote_handle);
        if let Err(e) = self.reporter.report_new_incoming(token, update).await {
            self.report_failure(FailureKind::Reporting, Some(token), "report_new_incoming", &e);
        }
        Ok(token)
    }

    /// Report a call we are placing and ask the OS to start it
    ///
    /// The OS answers the start request with a `StartOutgoing` intent.
    pub async fn report_outgoing(&mut self, token: CallToken, remote_handle: &str) -> CallSyncResult<()> {
        self.ensure_call_slot_free()?;

        let mut session = CallSession::outgoing(token, remote_handle, LifecycleState::OutgoingInit);
        session.advance_lifecycle(self.engine.current_state());
        info!(%token, remote = %remote_handle, "Reporting outgoing call");

        self.publish(&session);
        self.session = Some(session);

        let update = self.config.call_update(remote_handle);
        if let Err(e) = self.reporter.report_outgoing(token, update).await {
            self.report_failure(FailureKind::Reporting, Some(token), "report_outgoing", &e);
        }

        let request = CallRequest::StartCall {
            token,
            remote_handle: remote_handle.to_string(),
        };
        if let Err(e) = self.reporter.request_transaction(request).await {
            self.report_failure(FailureKind::Reporting, Some(token), "request_start_call", &e);
        }
        Ok(())
    }

    // ===== OS INTENTS =====

    /// Handle one OS action and acknowledge it
    pub async fn on_intent(&mut self, action: PendingAction) {
        debug!(action = %action.id, intent = action.intent.name(), "Dispatching OS intent");
        match action.intent {
            TelephonyIntent::Answer { token } => self.on_answer_intent(action.id, token).await,
            TelephonyIntent::End { token } => self.on_end_intent(action.id, token).await,
            TelephonyIntent::Mute { token, muted } => self.on_mute_intent(action.id, token, muted).await,
            TelephonyIntent::Hold { token, on_hold } => self.on_hold_intent(action.id, token, on_hold).await,
            TelephonyIntent::StartOutgoing { token } => self.on_start_outgoing(action.id, token).await,
        }
    }

    /// Answer: configure audio, then accept on the engine
    pub async fn on_answer_intent(&mut self, action: ActionId, token: CallToken) {
        let ack = self.answer(token).await;
        self.acknowledge(action, ack);
    }

    /// End: terminate, or decline while the remote is still ringing
    pub async fn on_end_intent(&mut self, action: ActionId, token: CallToken) {
        let ack = self.end(token).await;
        self.acknowledge(action, ack);
    }

    /// Mute: forwarded to the engine, always fulfilled
    pub async fn on_mute_intent(&mut self, action: ActionId, token: CallToken, muted: bool) {
        let ack = self.mute(token, muted).await;
        self.acknowledge(action, ack);
    }

    /// Hold: forwarded to the engine while the call is established
    pub async fn on_hold_intent(&mut self, action: ActionId, token: CallToken, on_hold: bool) {
        let ack = self.hold(token, on_hold).await;
        self.acknowledge(action, ack);
    }

    /// The OS started our outgoing call; configure audio for it
    pub async fn on_start_outgoing(&mut self, action: ActionId, token: CallToken) {
        let ack = self.start_outgoing(token).await;
        self.acknowledge(action, ack);
    }

    async fn answer(&mut self, token: CallToken) -> Acknowledgement {
        let Some(mut session) = self.take_session(token) else {
            return self.unknown_call(token, "answer");
        };

        let engine_state = self.engine.current_state();
        session.advance_lifecycle(engine_state);

        let ack = if session.phase == CallPhase::Ending
            || matches!(engine_state, LifecycleState::End | LifecycleState::Released)
        {
            warn!(%token, state = %engine_state, "Answer intent for a call that already ended");
            Acknowledgement::Failed
        } else if session.phase == CallPhase::Active {
            debug!(%token, "Call already answered");
            Acknowledgement::Fulfilled
        } else if session.direction == CallDirection::Outgoing {
            warn!(%token, "Answer intent for an outgoing call");
            Acknowledgement::Failed
        } else {
            // The audio session may only be configured from inside this action
            if let Err(e) = self.audio.configure().await {
                self.report_failure(FailureKind::AudioConfiguration, Some(token), "configure_audio", &e);
            }

            match self.engine.accept().await {
                Ok(()) => {
                    session.mark_active();
                    info!(%token, "Call answered");
                }
                Err(e) => {
                    self.report_failure(FailureKind::ProtocolAction, Some(token), ProtocolAction::Accept.as_str(), &e);
                    session.lifecycle = LifecycleState::Error;
                    session.is_running = false;
                }
            }
            self.publish(&session);
            Acknowledgement::Fulfilled
        };

        self.session = Some(session);
        ack
    }

    async fn end(&mut self, token: CallToken) -> Acknowledgement {
        let Some(mut session) = self.take_session(token) else {
            if self.session.is_some() {
                return self.unknown_call(token, "end");
            }
            debug!(%token, "End intent with no call in progress");
            return Acknowledgement::Fulfilled;
        };

        let outcome = self.issue_terminal_action(&mut session).await;
        session.clear_flags();

        match outcome {
            TerminalOutcome::Issued | TerminalOutcome::AlreadyIssued => {
                session.phase = CallPhase::Ending;
                self.publish(&session);
                self.session = Some(session);
            }
            TerminalOutcome::NotNeeded | TerminalOutcome::Failed => {
                self.close_session(session, "ended by user");
            }
        }
        Acknowledgement::Fulfilled
    }

    async fn mute(&mut self, token: CallToken, muted: bool) -> Acknowledgement {
        let Some(mut session) = self.take_session(token) else {
            return self.unknown_call(token, "mute");
        };

        if session.is_live() {
            match self.engine.set_mute(muted).await {
                Ok(()) => {
                    session.is_muted = muted;
                    debug!(%token, muted, "Microphone mute updated");
                }
                Err(e) => {
                    self.report_failure(FailureKind::ProtocolAction, Some(token), ProtocolAction::SetMute.as_str(), &e);
                }
            }
            self.publish(&session);
        }

        self.session = Some(session);
        Acknowledgement::Fulfilled
    }

    async fn hold(&mut self, token: CallToken, on_hold: bool) -> Acknowledgement {
        let Some(mut session) = self.take_session(token) else {
            return self.unknown_call(token, "hold");
        };

        let engine_state = self.engine.current_state();
        if session.is_live() && engine_state.is_mid_call() {
            match self.engine.set_hold(on_hold).await {
                Ok(()) => {
                    session.is_on_hold = on_hold;
                    info!(%token, on_hold, "Hold state updated");
                }
                Err(e) => {
                    self.report_failure(FailureKind::ProtocolAction, Some(token), ProtocolAction::SetHold.as_str(), &e);
                }
            }
            self.publish(&session);
        } else {
            debug!(%token, state = %engine_state, "Hold acknowledged without engine action");
        }

        self.session = Some(session);
        Acknowledgement::Fulfilled
    }

    async fn start_outgoing(&mut self, token: CallToken) -> Acknowledgement {
        let Some(session) = self.take_session(token) else {
            return self.unknown_call(token, "start_outgoing");
        };

        let ack = if session.direction == CallDirection::Outgoing && session.is_live() {
            if let Err(e) = self.audio.configure().await {
                self.report_failure(FailureKind::AudioConfiguration, Some(token), "configure_audio", &e);
            }
            Acknowledgement::Fulfilled
        } else {
            warn!(%token, phase = ?session.phase, "Start intent for a call that is not an outgoing call in progress");
            Acknowledgement::Failed
        };

        self.session = Some(session);
        ack
    }

    // ===== AUDIO SESSION =====

    /// Relay an OS audio session notification to the engine
    pub async fn on_audio_event(&mut self, event: AudioSessionEvent) {
        match event {
            AudioSessionEvent::Activated => self.on_audio_activated(true).await,
            AudioSessionEvent::Deactivated => self.on_audio_deactivated().await,
        }
    }

    /// Tell the engine the audio session became available or unavailable
    pub async fn on_audio_activated(&mut self, active: bool) {
        info!(active, "Audio session {}", if active { "activated" } else { "deactivated" });
        if let Err(e) = self.engine.set_audio_session_active(active).await {
            let token = self.session.as_ref().map(|s| s.token);
            self.report_failure(FailureKind::AudioConfiguration, token, ProtocolAction::SetAudioSession.as_str(), &e);
        }
    }

    pub async fn on_audio_deactivated(&mut self) {
        self.on_audio_activated(false).await;
    }

    // ===== REVERSE PATH: ENGINE EVENTS =====

    /// Forward an engine notification to observers and sync the session
    pub async fn on_protocol_event(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::CallStateChanged { state, remote_handle, message } => {
                if let Some(kind) = CallEventKind::for_lifecycle(state) {
                    let payload = CallEventPayload::Call {
                        message: message.clone(),
                        remote_handle: remote_handle.clone(),
                    };
                    self.events.emit(SyncEvent::Call(CallEvent::new(kind, payload)));
                }
                self.on_call_state(state, remote_handle, &message).await;
            }
            ProtocolEvent::RegistrationStateChanged { state, message } => {
                info!(?state, %message, "Registration state changed");
                let payload = CallEventPayload::Registration { state, message };
                self.events.emit(SyncEvent::Call(CallEvent::new(
                    CallEventKind::AccountRegistrationStateChanged,
                    payload,
                )));
            }
            ProtocolEvent::AudioDevicesChanged => {
                self.events.emit(SyncEvent::Call(CallEvent::new(
                    CallEventKind::AudioDevicesChanged,
                    CallEventPayload::None,
                )));
            }
            ProtocolEvent::SignalQualityChanged { quality } => {
                self.events.emit(SyncEvent::Call(CallEvent::new(
                    CallEventKind::SignalQualityChange,
                    CallEventPayload::Quality { quality },
                )));
            }
        }
    }

    async fn on_call_state(&mut self, state: LifecycleState, remote_handle: Option<String>, message: &str) {
        match state {
            LifecycleState::IncomingReceived => {
                let handle = remote_handle.unwrap_or_default();
                if let Err(e) = self.report_incoming(&handle).await {
                    warn!(error = %e, remote = %handle, "Incoming call not reported");
                }
            }
            LifecycleState::End | LifecycleState::Released | LifecycleState::Error => {
                let Some(token) = self.session.as_ref().map(|s| s.token) else {
                    return;
                };
                // Engine events carry no call identity; a trailing event from a
                // previous call must not end the one the engine is running now
                let engine_state = self.engine.current_state();
                if !engine_state.is_terminal() {
                    debug!(%token, event = %state, engine = %engine_state, "Ignoring terminal event while the engine call is alive");
                    return;
                }
                self.on_protocol_terminated(token, message).await;
            }
            _ => {
                let Some(mut session) = self.session.take() else {
                    debug!(%state, "Engine state change with no call session");
                    return;
                };

                if !session.advance_lifecycle(state) {
                    debug!(token = %session.token, from = %session.lifecycle, to = %state, "Ignoring out-of-order engine state");
                    self.session = Some(session);
                    return;
                }

                let connecting = matches!(state, LifecycleState::Connected | LifecycleState::StreamsRunning);
                if connecting && session.phase == CallPhase::Ringing(CallDirection::Outgoing) {
                    if let Err(e) = self.reporter.report_connected(session.token).await {
                        self.report_failure(FailureKind::Reporting, Some(session.token), "report_connected", &e);
                    }
                    session.mark_active();
                    info!(token = %session.token, "Outgoing call connected");
                }

                match state {
                    LifecycleState::Paused => session.is_on_hold = true,
                    LifecycleState::StreamsRunning => session.is_on_hold = false,
                    _ => {}
                }

                self.publish(&session);
                self.session = Some(session);
            }
        }
    }

    /// The engine ended the call on its own (remote hangup, network failure)
    ///
    /// Reports the end to the OS unless an OS end action already released the
    /// call record, then destroys the session.
    pub async fn on_protocol_terminated(&mut self, token: CallToken, reason: &str) {
        let Some(mut session) = self.take_session(token) else {
            debug!(%token, "Engine termination for a call that is already gone");
            return;
        };

        if session.phase != CallPhase::Ending {
            if let Err(e) = self.reporter.report_ended(token, reason).await {
                self.report_failure(FailureKind::Reporting, Some(token), "report_ended", &e);
            }
        }

        session.clear_flags();
        self.close_session(session, reason);
    }

    /// The engine refused to place the call `token`
    ///
    /// Observers get a call error event and the call is ended as if the engine
    /// had reported it.
    pub async fn on_call_failed(&mut self, token: CallToken, reason: &str) {
        if self.session.as_ref().map(|s| s.token) != Some(token) {
            debug!(%token, "Failed call is no longer the current session");
            return;
        }
        let payload = CallEventPayload::Call {
            message: reason.to_string(),
            remote_handle: self.session.as_ref().map(|s| s.remote_handle.clone()),
        };
        self.events.emit(SyncEvent::Call(CallEvent::new(CallEventKind::CallError, payload)));
        self.on_protocol_terminated(token, reason).await;
    }

    // ===== APP REQUESTS =====

    /// Mute requested by the app rather than the OS call UI
    ///
    /// The session's mute flag follows the engine so snapshots stay accurate.
    pub async fn set_mute(&mut self, muted: bool) -> CallSyncResult<()> {
        let token = self.session.as_ref().map(|s| s.token);
        if let Err(e) = self.engine.set_mute(muted).await {
            self.report_failure(FailureKind::ProtocolAction, token, ProtocolAction::SetMute.as_str(), &e);
            return Err(e);
        }

        if let Some(mut session) = self.session.take() {
            if session.is_live() {
                session.is_muted = muted;
                debug!(token = %session.token, muted, "Microphone mute updated");
                self.publish(&session);
            }
            self.session = Some(session);
        }
        Ok(())
    }

    /// Ask the OS to answer the ringing call
    pub async fn request_answer(&mut self) -> CallSyncResult<()> {
        let (token, phase) = match &self.session {
            Some(session) => (session.token, session.phase),
            None => return Err(CallSyncError::NoActiveCall),
        };
        if phase != CallPhase::Ringing(CallDirection::Incoming) {
            return Err(CallSyncError::invalid_state(format!("cannot answer a call in phase {:?}", phase)));
        }

        self.reporter
            .request_transaction(CallRequest::Answer { token })
            .await
            .map_err(|e| {
                self.report_failure(FailureKind::Reporting, Some(token), "request_answer", &e);
                e
            })
    }

    /// Ask the OS to end the call
    ///
    /// If the OS refuses the transaction the call is ended locally so that
    /// neither side is left with a live call.
    pub async fn request_end(&mut self) -> CallSyncResult<()> {
        let token = match &self.session {
            Some(session) if session.is_live() => session.token,
            Some(_) => return Ok(()),
            None => return Err(CallSyncError::NoActiveCall),
        };

        let Err(e) = self.reporter.request_transaction(CallRequest::End { token }).await else {
            return Ok(());
        };
        self.report_failure(FailureKind::Reporting, Some(token), "request_end", &e);

        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        self.issue_terminal_action(&mut session).await;
        session.clear_flags();
        if let Err(e) = self.reporter.report_ended(token, "ended locally").await {
            self.report_failure(FailureKind::Reporting, Some(token), "report_ended", &e);
        }
        self.close_session(session, "ended locally");
        Ok(())
    }

    // ===== HELPERS =====

    async fn issue_terminal_action(&self, session: &mut CallSession) -> TerminalOutcome {
        if session.end_issued {
            debug!(token = %session.token, "Terminal action already issued");
            return TerminalOutcome::AlreadyIssued;
        }

        let engine_state = self.engine.current_state();
        session.advance_lifecycle(engine_state);

        let action = match engine_state {
            // Caller gives up before the remote answers: CANCEL, not BYE
            LifecycleState::OutgoingRinging => ProtocolAction::Decline,
            LifecycleState::End | LifecycleState::Released => return TerminalOutcome::NotNeeded,
            _ => ProtocolAction::Terminate,
        };

        session.end_issued = true;
        info!(token = %session.token, state = %engine_state, %action, "Ending call");
        let result = match action {
            ProtocolAction::Decline => self.engine.decline().await,
            _ => self.engine.terminate().await,
        };

        match result {
            Ok(()) => TerminalOutcome::Issued,
            Err(e) => {
                self.report_failure(FailureKind::ProtocolAction, Some(session.token), action.as_str(), &e);
                TerminalOutcome::Failed
            }
        }
    }

    fn ensure_call_slot_free(&mut self) -> CallSyncResult<()> {
        let current = self.session.as_ref().map(|s| (s.token, s.is_live()));
        match current {
            Some((token, true)) => Err(CallSyncError::CallInProgress { token }),
            Some((_, false)) => {
                if let Some(previous) = self.session.take() {
                    warn!(token = %previous.token, "Replacing a session still waiting for the engine to end");
                    self.close_session(previous, "superseded");
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn take_session(&mut self, token: CallToken) -> Option<CallSession> {
        match &self.session {
            Some(session) if session.token == token => self.session.take(),
            _ => None,
        }
    }

    fn unknown_call(&self, token: CallToken, intent: &str) -> Acknowledgement {
        warn!(%token, intent, "Intent for an unknown call ignored");
        Acknowledgement::Failed
    }

    fn acknowledge(&self, action: ActionId, ack: Acknowledgement) {
        debug!(%action, ?ack, "Acknowledging OS action");
        self.reporter.acknowledge(action, ack);
    }

    fn publish(&self, session: &CallSession) {
        self.events.emit(SyncEvent::SessionUpdated(session.clone()));
    }

    fn close_session(&self, session: CallSession, reason: &str) {
        info!(token = %session.token, reason, "Call session closed");
        self.events.emit(SyncEvent::SessionClosed {
            token: session.token,
            reason: reason.to_string(),
        });
    }

    fn report_failure(&self, kind: FailureKind, token: Option<CallToken>, operation: &str, err: &CallSyncError) {
        match kind {
            FailureKind::ProtocolAction => error!(?token, operation, error = %err, "Protocol action failed"),
            _ => warn!(?token, operation, error = %err, "Non-fatal failure"),
        }
        self.events.emit(SyncEvent::Failure(FailureReport::new(kind, token, operation, err.to_string())));
    }
}
