//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{DecodeError, Result};

/// Environment variable that overrides the level passed to [`init_logging`].
pub const LOG_ENV: &str = "GRAPHWEAVE_LOG";

/// Installs a global `fmt` subscriber writing to stderr.
///
/// `level` is an `EnvFilter` directive such as `"debug"` or
/// `"graphweave::decode=trace"`. Fails if a subscriber is already set.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| DecodeError::Config(format!("invalid log level: {e}")))?,
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| DecodeError::Config("logging already initialized".into()))
}
