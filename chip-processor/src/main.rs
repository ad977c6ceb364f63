use std::sync::Arc;

use anyhow::{Context, Result};
use chip_processor::observability::init_tracing;
use chip_processor::{ProcessorConfig, build_dispatcher, start_server};
use envconfig::Envconfig;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ProcessorConfig::init_from_env().context("loading configuration")?;
    init_tracing(config.log_format).context("installing tracing subscriber")?;

    let dispatcher = build_dispatcher(&config)?;
    let mut topics: Vec<&str> = dispatcher.topics().topics().collect();
    topics.sort_unstable();
    info!(?topics, mode = ?config.aggregation_mode, "dispatcher ready");

    start_server(Arc::new(dispatcher), config.http_port).await?;
    Ok(())
}
