//! SIP engine surface used by the module
//!
//! [`ProtocolEngine`] covers what the reconciler needs for the current call.
//! [`SipEngine`] adds account, dialling and device operations that the
//! application triggers directly.

use async_trait::async_trait;
use leenphone_call_core::ProtocolEngine;
use serde::{Deserialize, Serialize};

use crate::devices::AudioDevice;
use crate::dtmf::DtmfTone;
use crate::error::{BridgeError, BridgeResult};
use crate::transport::TransportType;

/// Account the engine registers with
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCredentials {
    pub username: String,
    pub password: String,
    pub domain: String,
    pub transport: TransportType,
}

impl AccountCredentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        domain: impl Into<String>,
        transport: TransportType,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            domain: domain.into(),
            transport,
        }
    }

    /// Address of record, e.g. `sip:alice@example.com`
    pub fn identity(&self) -> String {
        format!("sip:{}@{}", self.username, self.domain)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.username.trim().is_empty() {
            return Err(BridgeError::invalid_argument("username", "must not be empty"));
        }
        if self.domain.trim().is_empty() {
            return Err(BridgeError::invalid_argument("domain", "must not be empty"));
        }
        if self.domain.contains('@') {
            return Err(BridgeError::invalid_argument("domain", "must not contain '@'"));
        }
        Ok(())
    }
}

// Keeps the password out of logs
impl std::fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Full engine surface behind the SIP module
#[async_trait]
pub trait SipEngine: ProtocolEngine {
    /// Start the engine core
    async fn start(&self) -> BridgeResult<()>;

    /// Register the account
    async fn register(&self, credentials: &AccountCredentials) -> BridgeResult<()>;

    /// Drop the account registration
    async fn unregister(&self) -> BridgeResult<()>;

    /// Place a call to `remote_uri`
    async fn invite(&self, remote_uri: &str) -> BridgeResult<()>;

    /// Play one DTMF tone on the current call
    async fn send_dtmf(&self, tone: DtmfTone) -> BridgeResult<()>;

    /// Whether the microphone is currently sending audio
    fn mic_enabled(&self) -> bool;

    /// Devices the engine can use
    fn audio_devices(&self) -> Vec<AudioDevice>;

    /// Id of the current playback device
    fn current_output_device(&self) -> Option<String>;

    /// Id of the current capture device
    fn current_input_device(&self) -> Option<String>;

    /// Route playback of the current call to a device
    async fn set_output_device(&self, device_id: &str) -> BridgeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_validation() {
        let creds = AccountCredentials::new("alice", "secret", "example.com", TransportType::Tls);
        assert!(creds.validate().is_ok());
        assert_eq!(creds.identity(), "sip:alice@example.com");

        let no_user = AccountCredentials::new(" ", "secret", "example.com", TransportType::Udp);
        assert!(matches!(no_user.validate(), Err(BridgeError::InvalidArgument { .. })));

        let bad_domain = AccountCredentials::new("alice", "secret", "alice@example.com", TransportType::Udp);
        assert!(bad_domain.validate().is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = AccountCredentials::new("alice", "secret", "example.com", TransportType::Udp);
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("alice"));
    }
}
