use anyhow::Context;
use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const DEFAULT_FILTER: &str = "drivedeal=debug,tower_http=debug";

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG`. Production emits one JSON object per event for log
/// shippers; elsewhere the console gets the compact format.
pub fn init_telemetry(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
            .context("Failed to install tracing subscriber")?;
    } else {
        let console_fmt = tracing_subscriber::fmt::layer().event_format(
            Format::default()
                .compact()
                .with_target(false)
                .without_time(),
        );
        tracing_subscriber::registry()
            .with(filter)
            .with(console_fmt)
            .try_init()
            .context("Failed to install tracing subscriber")?;
    }

    Ok(())
}
