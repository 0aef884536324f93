//! Global subscriber installation. Kept in its own test binary because it sets the
//! process-wide dispatcher.

use templog::config::Settings;
use templog::logging::{self, OutputFormat, TracingConfig};

#[test]
fn test_init_is_idempotent() {
    let config = TracingConfig::default()
        .with_format(OutputFormat::Compact)
        .with_ansi(false);
    assert!(logging::init(config.clone()).is_ok());
    assert!(tracing::dispatcher::has_been_set());

    // A second install, from either entry point, is a no-op
    assert!(logging::init(config).is_ok());
    assert!(logging::init_from_settings(&Settings::default()).is_ok());
    tracing::info!("Subscriber still usable after repeated init");
}
