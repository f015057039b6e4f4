//! Fake platform collaborators for driving the SIP module

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use leenphone_bridge::{
    AccountCredentials, AudioDevice, AudioDeviceType, BridgeConfig, BridgeError,
    BridgeResult, DtmfTone, SipEngine, SipModule,
};
use leenphone_call_core::{
    Acknowledgement, ActionId, AudioSessionController, CallRequest, CallSyncError, CallSyncResult, CallToken,
    CallUpdate, LifecycleState, ProtocolEngine, TelephonyReporter,
};

/// Engine that records what it was asked to do
#[derive(Debug)]
pub struct FakeSipEngine {
    pub state: Mutex<LifecycleState>,
    pub registered: Mutex<Option<AccountCredentials>>,
    pub invites: Mutex<Vec<String>>,
    pub tones: Mutex<Vec<DtmfTone>>,
    pub actions: Mutex<Vec<&'static str>>,
    pub mic_enabled: AtomicBool,
    pub devices: Mutex<Vec<AudioDevice>>,
    pub output: Mutex<Option<String>>,
    pub fail_invite: AtomicBool,
}

impl Default for FakeSipEngine {
    fn default() -> Self {
        use leenphone_bridge::AudioDeviceCapabilities::*;
        Self {
            state: Mutex::new(LifecycleState::Idle),
            registered: Mutex::new(None),
            invites: Mutex::new(Vec::new()),
            tones: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
            mic_enabled: AtomicBool::new(true),
            devices: Mutex::new(vec![
                AudioDevice::new("mic", "iPhone Microphone", AudioDeviceType::Microphone, CapabilityRecord),
                AudioDevice::new("ear", "iPhone", AudioDeviceType::Earpiece, CapabilityPlay),
                AudioDevice::new("spk", "Speaker", AudioDeviceType::Speaker, CapabilityPlay),
            ]),
            output: Mutex::new(Some("ear".to_string())),
            fail_invite: AtomicBool::new(false),
        }
    }
}

impl FakeSipEngine {
    pub fn set_state(&self, state: LifecycleState) {
        *self.state.lock() = state;
    }

    pub fn actions(&self) -> Vec<&'static str> {
        self.actions.lock().clone()
    }

    fn record(&self, action: &'static str) {
        self.actions.lock().push(action);
    }
}

#[async_trait]
impl ProtocolEngine for FakeSipEngine {
    async fn accept(&self) -> CallSyncResult<()> {
        self.record("accept");
        self.set_state(LifecycleState::Connected);
        Ok(())
    }

    async fn terminate(&self) -> CallSyncResult<()> {
        self.record("terminate");
        Ok(())
    }

    async fn decline(&self) -> CallSyncResult<()> {
        self.record("decline");
        Ok(())
    }

    async fn set_mute(&self, muted: bool) -> CallSyncResult<()> {
        self.record("set_mute");
        self.mic_enabled.store(!muted, Ordering::SeqCst);
        Ok(())
    }

    async fn set_hold(&self, _on_hold: bool) -> CallSyncResult<()> {
        self.record("set_hold");
        Ok(())
    }

    async fn set_audio_session_active(&self, _active: bool) -> CallSyncResult<()> {
        self.record("set_audio_session");
        Ok(())
    }

    fn current_state(&self) -> LifecycleState {
        *self.state.lock()
    }
}

#[async_trait]
impl SipEngine for FakeSipEngine {
    async fn start(&self) -> BridgeResult<()> {
        self.record("start");
        Ok(())
    }

    async fn register(&self, credentials: &AccountCredentials) -> BridgeResult<()> {
        *self.registered.lock() = Some(credentials.clone());
        Ok(())
    }

    async fn unregister(&self) -> BridgeResult<()> {
        *self.registered.lock() = None;
        Ok(())
    }

    async fn invite(&self, remote_uri: &str) -> BridgeResult<()> {
        if self.fail_invite.load(Ordering::SeqCst) {
            return Err(BridgeError::engine("invite", "no route to host"));
        }
        self.invites.lock().push(remote_uri.to_string());
        self.set_state(LifecycleState::OutgoingInit);
        Ok(())
    }

    async fn send_dtmf(&self, tone: DtmfTone) -> BridgeResult<()> {
        self.tones.lock().push(tone);
        Ok(())
    }

    fn mic_enabled(&self) -> bool {
        self.mic_enabled.load(Ordering::SeqCst)
    }

    fn audio_devices(&self) -> Vec<AudioDevice> {
        self.devices.lock().clone()
    }

    fn current_output_device(&self) -> Option<String> {
        self.output.lock().clone()
    }

    fn current_input_device(&self) -> Option<String> {
        Some("mic".to_string())
    }

    async fn set_output_device(&self, device_id: &str) -> BridgeResult<()> {
        *self.output.lock() = Some(device_id.to_string());
        Ok(())
    }
}

/// OS call UI stand-in
#[derive(Debug, Default)]
pub struct FakeReporter {
    pub incoming: Mutex<Vec<(CallToken, String)>>,
    pub outgoing: Mutex<Vec<(CallToken, String)>>,
    pub ended: Mutex<Vec<CallToken>>,
    pub transactions: Mutex<Vec<CallRequest>>,
    pub acks: Mutex<Vec<(ActionId, Acknowledgement)>>,
    pub reject_transactions: AtomicBool,
}

#[async_trait]
impl TelephonyReporter for FakeReporter {
    async fn report_new_incoming(&self, token: CallToken, update: CallUpdate) -> CallSyncResult<()> {
        self.incoming.lock().push((token, update.remote_handle));
        Ok(())
    }

    async fn report_outgoing(&self, token: CallToken, update: CallUpdate) -> CallSyncResult<()> {
        self.outgoing.lock().push((token, update.remote_handle));
        Ok(())
    }

    async fn report_connected(&self, _token: CallToken) -> CallSyncResult<()> {
        Ok(())
    }

    async fn report_ended(&self, token: CallToken, _reason: &str) -> CallSyncResult<()> {
        self.ended.lock().push(token);
        Ok(())
    }

    async fn request_transaction(&self, request: CallRequest) -> CallSyncResult<()> {
        self.transactions.lock().push(request);
        if self.reject_transactions.load(Ordering::SeqCst) {
            return Err(CallSyncError::reporting("request_transaction", "call UI unavailable"));
        }
        Ok(())
    }

    fn acknowledge(&self, action: ActionId, ack: Acknowledgement) {
        self.acks.lock().push((action, ack));
    }
}

#[derive(Debug, Default)]
pub struct FakeAudio;

#[async_trait]
impl AudioSessionController for FakeAudio {
    async fn configure(&self) -> CallSyncResult<()> {
        Ok(())
    }
}

pub struct Fixture {
    pub module: SipModule<FakeSipEngine>,
    pub engine: Arc<FakeSipEngine>,
    pub reporter: Arc<FakeReporter>,
}

impl Fixture {
    pub fn new() -> Self {
        let engine = Arc::new(FakeSipEngine::default());
        let reporter = Arc::new(FakeReporter::default());
        let module = SipModule::new(
            BridgeConfig::default(),
            engine.clone(),
            reporter.clone(),
            Arc::new(FakeAudio),
        )
        .expect("default config is valid");
        Self { module, engine, reporter }
    }

    pub async fn initialised() -> Self {
        let fixture = Self::new();
        fixture.module.initialise().await.expect("module initialises");
        fixture
    }
}
