// Logging module for structured logging using the tracing crate

use std::error::Error;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for structured logging.
///
/// Level filtering is env-driven (`RUST_LOG`), defaulting to `info`.
/// Output goes to stdout in compact form. Call once at application
/// startup; later calls return an error from the global registry.
///
/// # Examples
///
/// ```ignore
/// imprint::logging::init_subscriber().expect("Failed to initialize logging");
/// tracing::info!("starting compose run");
/// ```
pub fn init_subscriber() -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()?;

    Ok(())
}
