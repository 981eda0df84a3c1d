//! Tracing setup
//!
//! The subscriber starts before configuration is read so config-loading
//! messages are not lost. Once the TOML `[logging] level` is known it is
//! swapped in through a reload handle, unless `RUST_LOG` is set.

use anyhow::{Context, Result};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Level used until configuration has been read
pub const BOOTSTRAP_LEVEL: &str = "info";

/// Handle for replacing the active filter
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Filter for a configured level, keeping request traces visible
pub fn filter_for_level(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{},tower_http=debug", level))
}

/// `RUST_LOG` wins over the configured level
pub fn env_filter_overridden() -> bool {
    std::env::var_os(EnvFilter::DEFAULT_ENV).is_some()
}

/// Install the global subscriber and return the handle for [`apply_level`]
pub fn init() -> FilterHandle {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter_for_level(BOOTSTRAP_LEVEL));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    handle
}

/// Replace the active filter with the configured level
pub fn apply_level(handle: &FilterHandle, level: &str) -> Result<()> {
    handle
        .reload(filter_for_level(level))
        .with_context(|| format!("Failed to apply log level {}", level))
}
