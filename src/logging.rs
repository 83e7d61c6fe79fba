//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{RadixError, Result};

/// Installs a global fmt subscriber filtered by `level`, an `EnvFilter`
/// directive such as `"info"` or `"radixkv::storage=trace"`.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_new(level).map_err(|_| RadixError::Invalid("invalid log level"))?)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| RadixError::Invalid("logging already initialized"))
}
