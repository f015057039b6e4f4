//! # Leenphone Bridge - SIP module for mobile applications
//!
//! The surface an application layer calls to run a softphone: register an
//! account, place and answer calls, send DTMF, pick an audio route and listen
//! for named call events. Call state is kept consistent with the native OS
//! call UI by [`leenphone_call_core`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use leenphone_bridge::{BridgeConfig, SipEngine, SipModule, TransportType};
//! use leenphone_call_core::{AudioSessionController, TelephonyReporter};
//!
//! # async fn example<E: SipEngine + 'static>(
//! #     engine: Arc<E>,
//! #     reporter: Arc<dyn TelephonyReporter>,
//! #     audio: Arc<dyn AudioSessionController>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let module = SipModule::new(BridgeConfig::default(), engine, reporter, audio)?;
//! module.initialise().await?;
//!
//! let _ringing = module.add_listener("onCallRinging", |event| {
//!     println!("{} {}", event.name, event.body);
//! })?;
//!
//! module.login("alice", "secret", "example.com", TransportType::Tls).await?;
//! module.outgoing_call("sip:bob@example.com").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod devices;
pub mod dtmf;
pub mod engine;
pub mod error;
pub mod listeners;
pub mod logging;
pub mod module;
pub mod transport;

pub use config::{BridgeConfig, LoggingSection};
pub use devices::{
    AudioDevice, AudioDeviceCapabilities, AudioDeviceList, AudioDeviceType, AudioRoute, AudioRouteChange,
    AudioRouteOptions, RouteAvailability,
};
pub use dtmf::DtmfTone;
pub use engine::{AccountCredentials, SipEngine};
pub use error::{BridgeError, BridgeResult};
pub use listeners::{EventMessage, ListenerHandle, ListenerRegistry};
pub use logging::{parse_log_level, setup_logging, LogFormat, LoggingConfig};
pub use module::SipModule;
pub use transport::TransportType;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
