//! Global subscriber installation

use leenphone_bridge::{setup_logging, BridgeConfig, BridgeError, LogFormat, LoggingConfig};
use serial_test::serial;
use tracing::Level;

#[test]
#[serial]
fn test_second_setup_is_rejected() {
    let mut config = LoggingConfig::new(Level::DEBUG, "leenphone-test");
    config.source_location = true;

    // Another test in this binary may have installed the subscriber first
    let _ = setup_logging(&config);

    assert!(matches!(setup_logging(&config), Err(BridgeError::Config { .. })));
}

#[test]
#[serial]
fn test_setup_from_bridge_config() {
    let config = BridgeConfig::from_toml_str(
        r#"
        [logging]
        level = "warn"
        format = "json"
        input_spans = true
        "#,
    )
    .unwrap();

    let logging = config.logging_config().unwrap();
    assert_eq!(logging.level, Level::WARN);
    assert_eq!(logging.format, LogFormat::Json);
    assert!(logging.input_spans);

    let _ = setup_logging(&logging);
    tracing::warn!("logging configured from TOML");
}
