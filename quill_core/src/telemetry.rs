use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{
    config::{LogFormat, LoggingConfig},
    error::CoreError,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter when set. Fails if a subscriber
/// is already installed.
pub fn init(logging: &LoggingConfig) -> Result<(), CoreError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .map_err(|err| CoreError::Telemetry(format!("invalid log filter: {err}")))?;

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| CoreError::Telemetry(format!("failed to install tracing subscriber: {err}")))
}
