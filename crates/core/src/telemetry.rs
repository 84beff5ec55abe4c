//! Process-wide tracing subscriber setup for embedding binaries.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Installs a global fmt subscriber. `RUST_LOG` takes precedence over the
/// configured level. Returns `false` when a subscriber was already set.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.trim().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    match installed {
        Ok(()) => {
            tracing::info!(
                event_name = "system.logging.initialized",
                level = %config.level,
                format = ?config.format,
                "logging initialized"
            );
            true
        }
        Err(_) => false,
    }
}
