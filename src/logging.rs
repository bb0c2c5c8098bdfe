// src/logging.rs
// Diagnostics go to stderr so stdout carries nothing but the crawl output.
// Verbosity comes from RUST_LOG (e.g. RUST_LOG=site_mapper=debug).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "warn";

pub fn setup_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}
