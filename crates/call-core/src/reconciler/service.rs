//! Reconciler task and its handle
//!
//! OS callbacks and engine notifications arrive on independent paths. Both
//! enqueue [`ReconcilerInput`]s on the same channel; a single task drains it
//! and runs one handler at a time. An end intent that arrives while an answer
//! is waiting on the engine is therefore deferred until the answer completes,
//! never dropped. Enqueueing never blocks, so collaborators may call back into
//! the handle from inside a reporter method.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, debug_span, info, Instrument};

use super::Reconciler;
use crate::error::{CallSyncError, CallSyncResult};
use crate::intent::{AudioSessionEvent, PendingAction, ProtocolEvent};
use crate::types::{CallSession, CallToken};

/// Everything the reconciler task can be asked to do
#[derive(Debug)]
pub enum ReconcilerInput {
    ReportIncoming {
        remote_handle: String,
        reply: oneshot::Sender<CallSyncResult<CallToken>>,
    },
    ReportOutgoing {
        token: CallToken,
        remote_handle: String,
        reply: oneshot::Sender<CallSyncResult<()>>,
    },
    Intent(PendingAction),
    Audio(AudioSessionEvent),
    Protocol(ProtocolEvent),
    RequestAnswer {
        reply: oneshot::Sender<CallSyncResult<()>>,
    },
    RequestEnd {
        reply: oneshot::Sender<CallSyncResult<()>>,
    },
    /// App-side microphone toggle
    SetMute {
        muted: bool,
        reply: oneshot::Sender<CallSyncResult<()>>,
    },
    /// The engine could not set up the call it was asked to place
    CallFailed {
        token: CallToken,
        reason: String,
    },
    Snapshot {
        reply: oneshot::Sender<Option<CallSession>>,
    },
    Shutdown,
}

impl ReconcilerInput {
    /// Short name recorded on the input's span
    pub fn name(&self) -> &'static str {
        match self {
            ReconcilerInput::ReportIncoming { .. } => "report_incoming",
            ReconcilerInput::ReportOutgoing { .. } => "report_outgoing",
            ReconcilerInput::Intent(_) => "intent",
            ReconcilerInput::Audio(_) => "audio",
            ReconcilerInput::Protocol(_) => "protocol",
            ReconcilerInput::RequestAnswer { .. } => "request_answer",
            ReconcilerInput::RequestEnd { .. } => "request_end",
            ReconcilerInput::SetMute { .. } => "set_mute",
            ReconcilerInput::CallFailed { .. } => "call_failed",
            ReconcilerInput::Snapshot { .. } => "snapshot",
            ReconcilerInput::Shutdown => "shutdown",
        }
    }
}

impl Reconciler {
    /// Move the reconciler onto its own task
    pub fn spawn(self) -> (ReconcilerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (ReconcilerHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ReconcilerInput>) {
        info!("Call reconciler started");
        while let Some(input) = rx.recv().await {
            if matches!(input, ReconcilerInput::Shutdown) {
                break;
            }
            let span = debug_span!("reconciler_input", input = input.name());
            self.dispatch(input).instrument(span).await;
        }
        info!("Call reconciler stopped");
    }

    /// Route one input to its handler
    pub async fn dispatch(&mut self, input: ReconcilerInput) {
        match input {
            ReconcilerInput::ReportIncoming { remote_handle, reply } => {
                let result = self.report_incoming(&remote_handle).await;
                let _ = reply.send(result);
            }
            ReconcilerInput::ReportOutgoing { token, remote_handle, reply } => {
                let result = self.report_outgoing(token, &remote_handle).await;
                let _ = reply.send(result);
            }
            ReconcilerInput::Intent(action) => self.on_intent(action).await,
            ReconcilerInput::Audio(event) => self.on_audio_event(event).await,
            ReconcilerInput::Protocol(event) => self.on_protocol_event(event).await,
            ReconcilerInput::RequestAnswer { reply } => {
                let result = self.request_answer().await;
                let _ = reply.send(result);
            }
            ReconcilerInput::RequestEnd { reply } => {
                let result = self.request_end().await;
                let _ = reply.send(result);
            }
            ReconcilerInput::SetMute { muted, reply } => {
                let result = self.set_mute(muted).await;
                let _ = reply.send(result);
            }
            ReconcilerInput::CallFailed { token, reason } => self.on_call_failed(token, &reason).await,
            ReconcilerInput::Snapshot { reply } => {
                let _ = reply.send(self.session.clone());
            }
            ReconcilerInput::Shutdown => debug!("Shutdown requested"),
        }
    }
}

/// Cloneable entry point into a running reconciler
#[derive(Debug, Clone)]
pub struct ReconcilerHandle {
    tx: mpsc::UnboundedSender<ReconcilerInput>,
}

impl ReconcilerHandle {
    fn send(&self, input: ReconcilerInput) -> CallSyncResult<()> {
        self.tx.send(input).map_err(|_| CallSyncError::ReconcilerStopped)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ReconcilerInput,
    ) -> CallSyncResult<T> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply))?;
        response.await.map_err(|_| CallSyncError::ReconcilerStopped)
    }

    /// Report an incoming call and get its token
    pub async fn report_incoming(&self, remote_handle: impl Into<String>) -> CallSyncResult<CallToken> {
        let remote_handle = remote_handle.into();
        self.request(|reply| ReconcilerInput::ReportIncoming { remote_handle, reply })
            .await?
    }

    /// Report an outgoing call placed under `token`
    pub async fn report_outgoing(&self, token: CallToken, remote_handle: impl Into<String>) -> CallSyncResult<()> {
        let remote_handle = remote_handle.into();
        self.request(|reply| ReconcilerInput::ReportOutgoing { token, remote_handle, reply })
            .await?
    }

    /// Deliver an OS action; it is acknowledged through the reporter
    pub fn deliver_intent(&self, action: PendingAction) -> CallSyncResult<()> {
        self.send(ReconcilerInput::Intent(action))
    }

    /// Deliver an OS audio session notification
    pub fn deliver_audio(&self, event: AudioSessionEvent) -> CallSyncResult<()> {
        self.send(ReconcilerInput::Audio(event))
    }

    /// Deliver an engine notification
    pub fn deliver_protocol(&self, event: ProtocolEvent) -> CallSyncResult<()> {
        self.send(ReconcilerInput::Protocol(event))
    }

    /// Ask the OS to answer the ringing call
    pub async fn request_answer(&self) -> CallSyncResult<()> {
        self.request(|reply| ReconcilerInput::RequestAnswer { reply }).await?
    }

    /// Ask the OS to end the current call
    pub async fn request_end(&self) -> CallSyncResult<()> {
        self.request(|reply| ReconcilerInput::RequestEnd { reply }).await?
    }

    /// Mute or unmute the microphone outside of an OS action
    pub async fn set_mute(&self, muted: bool) -> CallSyncResult<()> {
        self.request(|reply| ReconcilerInput::SetMute { muted, reply }).await?
    }

    /// Close the call `token` because the engine never placed it
    pub fn call_failed(&self, token: CallToken, reason: impl Into<String>) -> CallSyncResult<()> {
        self.send(ReconcilerInput::CallFailed {
            token,
            reason: reason.into(),
        })
    }

    /// Copy of the current session once all earlier inputs are processed
    pub async fn current_session(&self) -> CallSyncResult<Option<CallSession>> {
        self.request(|reply| ReconcilerInput::Snapshot { reply }).await
    }

    /// Stop the task after the inputs already queued
    pub fn shutdown(&self) -> CallSyncResult<()> {
        self.send(ReconcilerInput::Shutdown)
    }

    /// Whether the task is still accepting inputs
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}
