pub mod aggregation;
pub mod conf;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod mutator;
pub mod observability;
pub mod server;
pub mod timeline;
pub mod topic;
pub mod upstream;

use std::sync::Arc;

use chip_index::ChallengeIndex;
use chip_index::elastic::ElasticChallengeIndex;
use chip_index::memory::MemoryChallengeIndex;
use tracing::info;

pub use conf::ProcessorConfig;
pub use dispatcher::Dispatcher;
pub use error::{ProcessorError, UpstreamError};
pub use handlers::{Outcome, SkipReason};
pub use server::{build_router, start_server};

use aggregation::AggregationFetcher;
use conf::IndexBackend;
use handlers::HandlerContext;
use mutator::DocumentMutator;
use upstream::UpstreamClient;

/// Opens the index backend selected by `INDEX_BACKEND`.
pub fn open_index(config: &ProcessorConfig) -> Result<Arc<dyn ChallengeIndex>, ProcessorError> {
    let index: Arc<dyn ChallengeIndex> = match config.index_backend {
        IndexBackend::Memory => Arc::new(MemoryChallengeIndex::new()),
        IndexBackend::Elastic => Arc::new(ElasticChallengeIndex::new(
            &config.es_host,
            &config.es_index,
            config.request_timeout(),
        )?),
    };
    info!(backend = ?config.index_backend, "challenge index opened");
    Ok(index)
}

/// Wires the dispatcher over an already opened index.
pub fn build_dispatcher_with_index(
    config: &ProcessorConfig,
    index: Arc<dyn ChallengeIndex>,
) -> Result<Dispatcher, ProcessorError> {
    let upstream = UpstreamClient::new(config)?;
    let ctx = HandlerContext {
        mutator: DocumentMutator::new(index),
        fetcher: AggregationFetcher::new(upstream, config),
    };
    Ok(Dispatcher::new(config.topic_map(), ctx))
}

pub fn build_dispatcher(config: &ProcessorConfig) -> Result<Dispatcher, ProcessorError> {
    let index = open_index(config)?;
    build_dispatcher_with_index(config, index)
}
