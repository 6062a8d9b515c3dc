//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber filtered by the configured
//! level. `RUST_LOG` wins over the settings when present.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::settings::LoggingSettings;

/// Install the global subscriber; later calls are no-ops
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level)
            .with_context(|| format!("Invalid log level: {}", settings.level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    // Already-installed subscribers (e.g. from another test) are fine
    let _ = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    Ok(())
}
