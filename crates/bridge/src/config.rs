//! SIP module configuration
//!
//! Loaded from TOML or built in code:
//!
//! ```rust
//! use leenphone_bridge::{BridgeConfig, TransportType};
//!
//! let config = BridgeConfig::from_toml_str(r#"
//!     default_transport = 2
//!
//!     [provider]
//!     localized_name = "Acme Phone"
//!
//!     [logging]
//!     level = "debug"
//! "#).unwrap();
//!
//! assert_eq!(config.default_transport, TransportType::Tls);
//! assert_eq!(config.provider.localized_name, "Acme Phone");
//! ```

use leenphone_call_core::ProviderConfig;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::logging::{parse_log_level, LogFormat, LoggingConfig};
use crate::transport::TransportType;

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    /// `"text"` or `"json"`
    pub format: LogFormat,
    pub source_location: bool,
    /// Trace every reconciler input as a span
    pub input_spans: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            source_location: false,
            input_spans: false,
        }
    }
}

/// Everything the SIP module needs at start-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// OS call UI provider settings
    pub provider: ProviderConfig,
    pub logging: LoggingSection,
    /// Transport used by `login` callers that do not pick one
    pub default_transport: TransportType,
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> BridgeResult<Self> {
        let config: BridgeConfig =
            toml::from_str(source).map_err(|e| BridgeError::config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    pub fn with_default_transport(mut self, transport: TransportType) -> Self {
        self.default_transport = transport;
        self
    }

    pub fn validate(&self) -> BridgeResult<()> {
        self.provider.validate()?;
        parse_log_level(&self.logging.level)?;
        Ok(())
    }

    /// Logging setup matching the `[logging]` section
    pub fn logging_config(&self) -> BridgeResult<LoggingConfig> {
        LoggingConfig::from_section(&self.logging, self.provider.localized_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leenphone_call_core::CallSyncError;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.provider.maximum_calls_per_call_group, 1);
        assert_eq!(config.default_transport, TransportType::Udp);
    }

    #[test]
    fn test_rejects_multiple_calls() {
        let result = BridgeConfig::from_toml_str(
            r#"
            [provider]
            maximum_calls_per_call_group = 2
            "#,
        );
        assert!(matches!(result, Err(BridgeError::Core(CallSyncError::Configuration { .. }))));
    }

    #[test]
    fn test_rejects_unknown_transport_and_level() {
        assert!(BridgeConfig::from_toml_str("default_transport = 7").is_err());
        assert!(BridgeConfig::from_toml_str("[logging]\nlevel = \"chatty\"").is_err());
    }

    #[test]
    fn test_logging_config_from_section() {
        let config = BridgeConfig::new().with_log_level("trace");
        let logging = config.logging_config().unwrap();
        assert_eq!(logging.level, tracing::Level::TRACE);
        assert_eq!(logging.provider, "Leenphone");
    }

    #[test]
    fn test_logging_section_from_toml() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [logging]
            format = "json"
            input_spans = true
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.logging.input_spans);
        assert!(!config.logging.source_location);
        assert!(BridgeConfig::from_toml_str("[logging]\nformat = \"xml\"").is_err());
    }
}
