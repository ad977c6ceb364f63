use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::LogFormat;

pub const LOG_ENV: &str = "CHIP_LOG";
const DEFAULT_LEVEL: &str = "info";

/// Installs the global subscriber. The filter comes from `CHIP_LOG`.
pub fn init_tracing(format: LogFormat) -> Result<(), TryInitError> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);
    let fmt_layer = match format {
        LogFormat::Json => fmt_layer.json().boxed(),
        LogFormat::Plain => fmt_layer.boxed(),
    };
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    Registry::default().with(env_filter).with(fmt_layer).try_init()
}
