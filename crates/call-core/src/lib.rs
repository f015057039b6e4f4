//! # Call Core - OS call UI / SIP engine state reconciliation
//!
//! A mobile call has three independent state machines: the OS call UI, the
//! SIP engine's call, and the platform audio session. This crate keeps them in
//! agreement through a single [`Reconciler`]:
//!
//! - **OS intents** (answer, end, mute, hold, start) become engine actions and
//!   are always acknowledged back to the OS
//! - **Engine events** (ringing, connected, ended) become OS reports and named
//!   application events
//! - **Audio session** activation is relayed to the engine, which never
//!   touches the audio hardware on its own
//!
//! The three collaborators are traits ([`TelephonyReporter`],
//! [`ProtocolEngine`], [`AudioSessionController`]) implemented by the platform
//! glue.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use leenphone_call_core::{
//!     AudioSessionController, PendingAction, ProtocolEngine, ProviderConfig, Reconciler,
//!     TelephonyIntent, TelephonyReporter,
//! };
//!
//! # async fn example(
//! #     reporter: Arc<dyn TelephonyReporter>,
//! #     engine: Arc<dyn ProtocolEngine>,
//! #     audio: Arc<dyn AudioSessionController>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let reconciler = Reconciler::new(ProviderConfig::default(), reporter, engine, audio)?;
//! let (handle, _task) = reconciler.spawn();
//!
//! // The engine received an INVITE
//! let token = handle.report_incoming("alice@example.com").await?;
//!
//! // The user tapped "answer" in the OS call UI
//! handle.deliver_intent(PendingAction::new(TelephonyIntent::Answer { token }))?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod intent;
pub mod reconciler;
pub mod reporter;
pub mod types;

pub use audio::AudioSessionController;
pub use config::{HandleType, ProviderConfig};
pub use engine::{ProtocolAction, ProtocolEngine};
pub use error::{CallSyncError, CallSyncResult};
pub use events::{
    CallEvent, CallEventKind, CallEventPayload, EventEmitter, EventStream, FailureKind, FailureReport, SyncEvent,
};
pub use intent::{
    Acknowledgement, ActionId, AudioSessionEvent, PendingAction, ProtocolEvent, RegistrationState, TelephonyIntent,
};
pub use reconciler::{Reconciler, ReconcilerHandle, ReconcilerInput};
pub use reporter::{CallRequest, CallUpdate, TelephonyReporter};
pub use types::{CallDirection, CallPhase, CallSession, CallToken, LifecycleState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
