//! Recording fakes for the reconciler's collaborators

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use leenphone_call_core::{
    Acknowledgement, ActionId, AudioSessionController, CallEventKind, CallRequest, CallSyncError, CallSyncResult,
    CallToken, CallUpdate, FailureKind, FailureReport, LifecycleState, ProtocolEngine, ProviderConfig, Reconciler,
    SyncEvent, TelephonyReporter,
};

/// Every collaborator call, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ReportNewIncoming(CallToken, String),
    ReportOutgoing(CallToken, String),
    ReportConnected(CallToken),
    ReportEnded(CallToken),
    Transaction(CallRequest),
    Ack(ActionId, Acknowledgement),
    Accept,
    Terminate,
    Decline,
    SetMute(bool),
    SetHold(bool),
    SetAudioSession(bool),
    ConfigureAudio,
}

#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls.lock().iter().filter(|call| *call == wanted).count()
    }

    pub fn position(&self, wanted: &Call) -> Option<usize> {
        self.calls.lock().iter().position(|call| call == wanted)
    }

    /// Number of terminate + decline actions
    pub fn terminal_actions(&self) -> usize {
        self.count(&Call::Terminate) + self.count(&Call::Decline)
    }

    pub fn acks(&self) -> Vec<(ActionId, Acknowledgement)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Ack(id, ack) => Some((*id, *ack)),
                _ => None,
            })
            .collect()
    }

    pub fn acks_for(&self, action: ActionId) -> Vec<Acknowledgement> {
        self.acks().into_iter().filter(|(id, _)| *id == action).map(|(_, ack)| ack).collect()
    }
}

#[derive(Debug, Default)]
pub struct FakeReporter {
    log: Recorder,
    pub fail_reports: AtomicBool,
    pub fail_transactions: AtomicBool,
}

impl FakeReporter {
    fn check(&self, flag: &AtomicBool, operation: &str) -> CallSyncResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(CallSyncError::reporting(operation, "rejected by the OS"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TelephonyReporter for FakeReporter {
    async fn report_new_incoming(&self, token: CallToken, update: CallUpdate) -> CallSyncResult<()> {
        self.log.push(Call::ReportNewIncoming(token, update.remote_handle));
        self.check(&self.fail_reports, "report_new_incoming")
    }

    async fn report_outgoing(&self, token: CallToken, update: CallUpdate) -> CallSyncResult<()> {
        self.log.push(Call::ReportOutgoing(token, update.remote_handle));
        self.check(&self.fail_reports, "report_outgoing")
    }

    async fn report_connected(&self, token: CallToken) -> CallSyncResult<()> {
        self.log.push(Call::ReportConnected(token));
        self.check(&self.fail_reports, "report_connected")
    }

    async fn report_ended(&self, token: CallToken, _reason: &str) -> CallSyncResult<()> {
        self.log.push(Call::ReportEnded(token));
        self.check(&self.fail_reports, "report_ended")
    }

    async fn request_transaction(&self, request: CallRequest) -> CallSyncResult<()> {
        self.log.push(Call::Transaction(request));
        self.check(&self.fail_transactions, "request_transaction")
    }

    fn acknowledge(&self, action: ActionId, ack: Acknowledgement) {
        self.log.push(Call::Ack(action, ack));
    }
}

#[derive(Debug)]
pub struct FakeEngine {
    log: Recorder,
    state: Mutex<LifecycleState>,
    accept_delay: Mutex<Option<Duration>>,
    pub fail_accept: AtomicBool,
    pub fail_terminate: AtomicBool,
    pub fail_mute: AtomicBool,
    pub fail_audio_session: AtomicBool,
}

impl FakeEngine {
    pub fn set_state(&self, state: LifecycleState) {
        *self.state.lock() = state;
    }

    pub fn delay_accept(&self, delay: Duration) {
        *self.accept_delay.lock() = Some(delay);
    }

    fn check(&self, flag: &AtomicBool, action: &str) -> CallSyncResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(CallSyncError::protocol(action, "engine refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProtocolEngine for FakeEngine {
    async fn accept(&self) -> CallSyncResult<()> {
        let delay = *self.accept_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.log.push(Call::Accept);
        self.check(&self.fail_accept, "accept")?;
        self.set_state(LifecycleState::Connected);
        Ok(())
    }

    async fn terminate(&self) -> CallSyncResult<()> {
        self.log.push(Call::Terminate);
        self.check(&self.fail_terminate, "terminate")
    }

    async fn decline(&self) -> CallSyncResult<()> {
        self.log.push(Call::Decline);
        self.check(&self.fail_terminate, "decline")
    }

    async fn set_mute(&self, muted: bool) -> CallSyncResult<()> {
        self.log.push(Call::SetMute(muted));
        self.check(&self.fail_mute, "set_mute")
    }

    async fn set_hold(&self, on_hold: bool) -> CallSyncResult<()> {
        self.log.push(Call::SetHold(on_hold));
        Ok(())
    }

    async fn set_audio_session_active(&self, active: bool) -> CallSyncResult<()> {
        self.log.push(Call::SetAudioSession(active));
        self.check(&self.fail_audio_session, "set_audio_session")
    }

    fn current_state(&self) -> LifecycleState {
        *self.state.lock()
    }
}

#[derive(Debug, Default)]
pub struct FakeAudio {
    log: Recorder,
    pub fail: AtomicBool,
}

#[async_trait]
impl AudioSessionController for FakeAudio {
    async fn configure(&self) -> CallSyncResult<()> {
        self.log.push(Call::ConfigureAudio);
        if self.fail.load(Ordering::SeqCst) {
            Err(CallSyncError::audio("category could not be set"))
        } else {
            Ok(())
        }
    }
}

/// Reconciler wired to recording fakes that share one call log
pub struct Harness {
    pub reconciler: Reconciler,
    pub log: Recorder,
    pub reporter: Arc<FakeReporter>,
    pub engine: Arc<FakeEngine>,
    pub audio: Arc<FakeAudio>,
    pub events: broadcast::Receiver<SyncEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ProviderConfig::default())
    }

    pub fn with_config(config: ProviderConfig) -> Self {
        let log = Recorder::default();
        let reporter = Arc::new(FakeReporter {
            log: log.clone(),
            ..Default::default()
        });
        let engine = Arc::new(FakeEngine {
            log: log.clone(),
            state: Mutex::new(LifecycleState::Idle),
            accept_delay: Mutex::new(None),
            fail_accept: AtomicBool::new(false),
            fail_terminate: AtomicBool::new(false),
            fail_mute: AtomicBool::new(false),
            fail_audio_session: AtomicBool::new(false),
        });
        let audio = Arc::new(FakeAudio {
            log: log.clone(),
            ..Default::default()
        });

        let reconciler = Reconciler::new(config, reporter.clone(), engine.clone(), audio.clone())
            .expect("valid configuration");
        let events = reconciler.events().receiver();

        Self {
            reconciler,
            log,
            reporter,
            engine,
            audio,
            events,
        }
    }

    /// Take every event published so far
    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn failures(&mut self) -> Vec<FailureReport> {
        self.drain_events()
            .into_iter()
            .filter_map(|event| match event {
                SyncEvent::Failure(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    pub fn failure_kinds(&mut self) -> Vec<FailureKind> {
        self.failures().into_iter().map(|report| report.kind).collect()
    }

    pub fn call_events(&mut self) -> Vec<CallEventKind> {
        self.drain_events()
            .into_iter()
            .filter_map(|event| match event {
                SyncEvent::Call(event) => Some(event.kind),
                _ => None,
            })
            .collect()
    }

    /// Incoming call already reported to the OS
    pub async fn ringing_incoming(&mut self, remote: &str) -> CallToken {
        self.engine.set_state(LifecycleState::IncomingReceived);
        self.reconciler
            .report_incoming(remote)
            .await
            .expect("incoming call reported")
    }

    /// Outgoing call reported to the OS and ringing at the remote
    pub async fn ringing_outgoing(&mut self, remote: &str) -> CallToken {
        let token = CallToken::new();
        self.engine.set_state(LifecycleState::OutgoingInit);
        self.reconciler
            .report_outgoing(token, remote)
            .await
            .expect("outgoing call reported");
        self.engine.set_state(LifecycleState::OutgoingRinging);
        token
    }
}
