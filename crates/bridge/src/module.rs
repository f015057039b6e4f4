//! The SIP module exposed to the application layer
//!
//! [`SipModule`] owns the engine and, once initialised, a running
//! [`Reconciler`]. Application calls that change the current call (answer,
//! hang up) go through the OS call UI as transactions; the OS then delivers
//! the matching intent, which the platform glue passes to
//! [`SipModule::deliver_intent`]. Engine notifications enter through
//! [`SipModule::deliver_protocol`].

use std::sync::Arc;

use leenphone_call_core::{
    AudioSessionController, AudioSessionEvent, CallPhase, CallSession, CallSyncError, CallToken, EventEmitter,
    EventStream, PendingAction, ProtocolEngine, ProtocolEvent, Reconciler, ReconcilerHandle, TelephonyReporter,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::devices::{find_route_device, scan_routes, AudioDeviceList, AudioRoute, AudioRouteChange, AudioRouteOptions};
use crate::dtmf;
use crate::engine::{AccountCredentials, SipEngine};
use crate::error::{BridgeError, BridgeResult};
use crate::listeners::{EventMessage, ListenerHandle, ListenerRegistry};
use crate::transport::TransportType;

/// Tasks started by `initialise`
struct Running {
    handle: ReconcilerHandle,
    reconciler: JoinHandle<()>,
    forwarder: JoinHandle<()>,
}

/// Application-facing SIP module
pub struct SipModule<E: SipEngine + 'static> {
    config: BridgeConfig,
    engine: Arc<E>,
    reporter: Arc<dyn TelephonyReporter>,
    audio: Arc<dyn AudioSessionController>,
    events: EventEmitter,
    listeners: ListenerRegistry,
    running: Mutex<Option<Running>>,
}

impl<E: SipEngine + 'static> SipModule<E> {
    /// Create an uninitialised module
    pub fn new(
        config: BridgeConfig,
        engine: Arc<E>,
        reporter: Arc<dyn TelephonyReporter>,
        audio: Arc<dyn AudioSessionController>,
    ) -> BridgeResult<Self> {
        config.validate()?;
        let events = EventEmitter::new(config.provider.event_capacity);
        Ok(Self {
            config,
            engine,
            reporter,
            audio,
            events,
            listeners: ListenerRegistry::new(),
            running: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn is_initialised(&self) -> bool {
        self.running.lock().is_some()
    }

    // ===== LIFECYCLE =====

    /// Start the engine and the call reconciler
    pub async fn initialise(&self) -> BridgeResult<()> {
        if self.is_initialised() {
            return Err(BridgeError::AlreadyInitialised);
        }

        self.engine.start().await?;

        let protocol: Arc<dyn ProtocolEngine> = self.engine.clone();
        let reconciler = Reconciler::new(
            self.config.provider.clone(),
            Arc::clone(&self.reporter),
            protocol,
            Arc::clone(&self.audio),
        )?
        .with_events(self.events.clone());

        let forwarder = self.listeners.spawn_forwarder(self.events.subscribe_simple());
        let (handle, task) = reconciler.spawn();

        let mut running = self.running.lock();
        if running.is_some() {
            // Lost a race with a concurrent initialise
            let _ = handle.shutdown();
            forwarder.abort();
            return Err(BridgeError::AlreadyInitialised);
        }
        *running = Some(Running {
            handle,
            reconciler: task,
            forwarder,
        });
        info!(provider = %self.config.provider.localized_name, "SIP module initialised");
        Ok(())
    }

    /// Stop the reconciler; the module can be initialised again afterwards
    pub async fn shutdown(&self) -> BridgeResult<()> {
        let running = self.running.lock().take();
        let Some(running) = running else {
            return Err(BridgeError::NotInitialised);
        };
        let _ = running.handle.shutdown();
        if let Err(e) = running.reconciler.await {
            warn!(error = %e, "Reconciler task ended abnormally");
        }
        running.forwarder.abort();
        info!("SIP module shut down");
        Ok(())
    }

    fn handle(&self) -> BridgeResult<ReconcilerHandle> {
        self.running
            .lock()
            .as_ref()
            .map(|running| running.handle.clone())
            .ok_or(BridgeError::NotInitialised)
    }

    // ===== ACCOUNT =====

    /// Register an account with the engine
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        domain: &str,
        transport: TransportType,
    ) -> BridgeResult<()> {
        self.handle()?;
        let credentials = AccountCredentials::new(username, password, domain, transport);
        credentials.validate()?;

        info!(identity = %credentials.identity(), %transport, "Registering account");
        self.engine.register(&credentials).await
    }

    /// Register with the configured default transport
    pub async fn login_default(&self, username: &str, password: &str, domain: &str) -> BridgeResult<()> {
        self.login(username, password, domain, self.config.default_transport).await
    }

    pub async fn unregister(&self) -> BridgeResult<()> {
        self.handle()?;
        info!("Unregistering account");
        self.engine.unregister().await
    }

    // ===== CALLS =====

    /// Place a call and report it to the OS call UI
    pub async fn outgoing_call(&self, remote_uri: &str) -> BridgeResult<CallToken> {
        let handle = self.handle()?;
        if remote_uri.trim().is_empty() {
            return Err(BridgeError::invalid_argument("remote_uri", "must not be empty"));
        }

        let token = CallToken::new();
        handle.report_outgoing(token, remote_uri).await?;

        if let Err(e) = self.engine.invite(remote_uri).await {
            warn!(%token, remote = %remote_uri, error = %e, "Engine could not place the call");
            handle.call_failed(token, e.to_string())?;
            return Err(e);
        }

        info!(%token, remote = %remote_uri, "Outgoing call placed");
        Ok(token)
    }

    /// Answer the ringing call through the OS call UI
    pub async fn accept(&self) -> BridgeResult<()> {
        Ok(self.handle()?.request_answer().await?)
    }

    /// Reject the ringing call
    pub async fn decline(&self) -> BridgeResult<()> {
        Ok(self.handle()?.request_end().await?)
    }

    /// End the current call
    pub async fn hang_up(&self) -> BridgeResult<()> {
        Ok(self.handle()?.request_end().await?)
    }

    /// Play DTMF digits (`0-9`, `*`, `#`, `A-D`) on the current call
    pub async fn send_dtmf(&self, digits: &str) -> BridgeResult<()> {
        let handle = self.handle()?;
        let tones = dtmf::parse_sequence(digits)?;
        match handle.current_session().await? {
            None => return Err(CallSyncError::NoActiveCall.into()),
            Some(session) if session.phase != CallPhase::Active => {
                return Err(CallSyncError::invalid_state(format!(
                    "cannot send DTMF to a call in phase {:?}",
                    session.phase
                ))
                .into());
            }
            Some(_) => {}
        }

        debug!(digits, "Sending DTMF");
        for tone in tones {
            self.engine.send_dtmf(tone).await?;
        }
        Ok(())
    }

    /// Flip the microphone; returns whether it is now enabled
    pub async fn toggle_mute(&self) -> BridgeResult<bool> {
        let handle = self.handle()?;
        let enabled = self.engine.mic_enabled();
        handle.set_mute(enabled).await?;
        info!(mic_enabled = !enabled, "Microphone toggled");
        Ok(!enabled)
    }

    pub async fn mic_enabled(&self) -> BridgeResult<bool> {
        self.handle()?;
        Ok(self.engine.mic_enabled())
    }

    /// Current call session, if any
    pub async fn current_call(&self) -> BridgeResult<Option<CallSession>> {
        Ok(self.handle()?.current_session().await?)
    }

    // ===== AUDIO DEVICES =====

    pub async fn get_audio_devices(&self) -> BridgeResult<AudioDeviceList> {
        self.handle()?;
        Ok(AudioDeviceList {
            devices: self.engine.audio_devices(),
            current_output: self.engine.current_output_device().unwrap_or_default(),
            current_input: self.engine.current_input_device().unwrap_or_default(),
            muted: !self.engine.mic_enabled(),
        })
    }

    /// Which routes are available and which one is in use
    pub async fn scan_audio_devices(&self) -> BridgeResult<AudioRouteOptions> {
        self.handle()?;
        let devices = self.engine.audio_devices();
        let current = self.engine.current_output_device().unwrap_or_default();
        Ok(scan_routes(&devices, &current))
    }

    pub async fn bluetooth_audio(&self) -> BridgeResult<AudioRouteChange> {
        self.set_audio_route(AudioRoute::Bluetooth).await
    }

    pub async fn loud_audio(&self) -> BridgeResult<AudioRouteChange> {
        self.set_audio_route(AudioRoute::Loudspeaker).await
    }

    pub async fn phone_audio(&self) -> BridgeResult<AudioRouteChange> {
        self.set_audio_route(AudioRoute::Phone).await
    }

    /// Send call audio to the first playback device serving `route`
    pub async fn set_audio_route(&self, route: AudioRoute) -> BridgeResult<AudioRouteChange> {
        self.handle()?;
        let devices = self.engine.audio_devices();
        let device = find_route_device(&devices, route).ok_or(BridgeError::NoAudioRoute { route })?;

        self.engine.set_output_device(&device.id).await?;
        info!(%route, device = %device.name, "Audio route changed");
        Ok(AudioRouteChange {
            message: format!("Audio routed to {} ({})", route, device.name),
            id: device.id.clone(),
        })
    }

    // ===== EVENTS =====

    /// Register an application callback (`onCallRinging`, `onCallEnd`, ...)
    pub fn add_listener<F>(&self, callback_name: &str, listener: F) -> BridgeResult<ListenerHandle>
    where
        F: Fn(&EventMessage) + Send + Sync + 'static,
    {
        self.listeners.add_listener(callback_name, listener)
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Raw reconciler events, including session updates and failures
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    // ===== PLATFORM GLUE =====

    /// OS call UI action
    pub fn deliver_intent(&self, action: PendingAction) -> BridgeResult<()> {
        Ok(self.handle()?.deliver_intent(action)?)
    }

    /// OS audio session notification
    pub fn deliver_audio(&self, event: AudioSessionEvent) -> BridgeResult<()> {
        Ok(self.handle()?.deliver_audio(event)?)
    }

    /// Engine notification
    pub fn deliver_protocol(&self, event: ProtocolEvent) -> BridgeResult<()> {
        Ok(self.handle()?.deliver_protocol(event)?)
    }
}

impl<E: SipEngine + 'static> std::fmt::Debug for SipModule<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SipModule")
            .field("config", &self.config)
            .field("initialised", &self.is_initialised())
            .field("listeners", &self.listeners)
            .finish()
    }
}
