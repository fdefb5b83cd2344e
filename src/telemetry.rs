use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::settings::LogSettings;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `settings.level`; an unparsable level falls back to
/// `info`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(settings: &LogSettings) -> anyhow::Result<()> {
    let fmt_layer = if settings.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter(settings))
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

fn env_filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
