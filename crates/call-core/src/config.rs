//! Telephony provider configuration
//!
//! Mirrors the settings the OS call subsystem is created with. The call
//! limits are fixed at one call in one group: the reconciler tracks a single
//! session and refuses anything else at validation time.
//!
//! ```rust
//! use leenphone_call_core::ProviderConfig;
//!
//! let config = ProviderConfig::new("Leenphone")
//!     .with_holding(false)
//!     .with_event_capacity(64);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.maximum_calls_per_call_group, 1);
//! assert!(!config.supports_holding);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CallSyncError, CallSyncResult};
use crate::reporter::CallUpdate;

/// Kind of handle the OS call UI accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleType {
    Generic,
    PhoneNumber,
    EmailAddress,
}

/// Configuration of the OS telephony provider and the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Application name shown in the native call UI
    pub localized_name: String,
    /// Whether video calls are offered
    pub supports_video: bool,
    /// Handle types accepted by the call UI
    pub supported_handle_types: Vec<HandleType>,
    /// Calls per group (must be 1)
    pub maximum_calls_per_call_group: u32,
    /// Call groups (must be 1)
    pub maximum_call_groups: u32,
    /// Whether the call UI offers hold
    pub supports_holding: bool,
    /// Whether the call UI offers a keypad
    pub supports_dtmf: bool,
    /// Capacity of the broadcast event channel
    pub event_capacity: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            localized_name: "Leenphone".to_string(),
            supports_video: false,
            supported_handle_types: vec![HandleType::Generic],
            maximum_calls_per_call_group: 1,
            maximum_call_groups: 1,
            supports_holding: true,
            supports_dtmf: true,
            event_capacity: 256,
        }
    }
}

impl ProviderConfig {
    /// Create a configuration with the given UI name
    pub fn new(localized_name: impl Into<String>) -> Self {
        Self {
            localized_name: localized_name.into(),
            ..Default::default()
        }
    }

    pub fn with_holding(mut self, supports_holding: bool) -> Self {
        self.supports_holding = supports_holding;
        self
    }

    pub fn with_dtmf(mut self, supports_dtmf: bool) -> Self {
        self.supports_dtmf = supports_dtmf;
        self
    }

    pub fn with_handle_types(mut self, handle_types: Vec<HandleType>) -> Self {
        self.supported_handle_types = handle_types;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Check the invariants the reconciler relies on
    pub fn validate(&self) -> CallSyncResult<()> {
        if self.maximum_calls_per_call_group != 1 || self.maximum_call_groups != 1 {
            return Err(CallSyncError::config(format!(
                "only a single call is supported (calls per group {}, groups {})",
                self.maximum_calls_per_call_group, self.maximum_call_groups
            )));
        }
        if self.supported_handle_types.is_empty() {
            return Err(CallSyncError::config("at least one handle type is required"));
        }
        if self.event_capacity == 0 {
            return Err(CallSyncError::config("event capacity must be greater than zero"));
        }
        Ok(())
    }

    /// Build the call UI update for a remote handle
    pub fn call_update(&self, remote_handle: &str) -> CallUpdate {
        CallUpdate {
            remote_handle: remote_handle.to_string(),
            supports_holding: self.supports_holding,
            supports_dtmf: self.supports_dtmf,
            has_video: self.supports_video,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProviderConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.supports_video);
        assert_eq!(config.supported_handle_types, vec![HandleType::Generic]);
    }

    #[test]
    fn test_multiple_calls_rejected() {
        let mut config = ProviderConfig::default();
        config.maximum_calls_per_call_group = 2;
        assert!(matches!(config.validate(), Err(CallSyncError::Configuration { .. })));

        let mut config = ProviderConfig::default();
        config.maximum_call_groups = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_call_update_follows_config() {
        let config = ProviderConfig::new("Test").with_holding(false).with_dtmf(true);
        let update = config.call_update("bob@example.com");
        assert_eq!(update.remote_handle, "bob@example.com");
        assert!(!update.supports_holding);
        assert!(update.supports_dtmf);
        assert!(!update.has_video);
    }
}
