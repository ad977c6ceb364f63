use std::sync::Arc;

use chip_index::{ChallengeIndex, DocVersion, Document, IndexError, PartialUpdate, VersionedDocument};
use tracing::{debug, info};

use crate::error::ProcessorError;

/// Applies partial documents to the challenge index. Every write asks for
/// immediate visibility so later events read their own derived counts.
#[derive(Clone)]
pub struct DocumentMutator {
    index: Arc<dyn ChallengeIndex>,
}

impl DocumentMutator {
    pub fn new(index: Arc<dyn ChallengeIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<dyn ChallengeIndex> {
        &self.index
    }

    /// Reads the stored document together with its concurrency token.
    pub async fn read_versioned(&self, id: &str) -> Result<VersionedDocument, ProcessorError> {
        self.index
            .get(id)
            .await?
            .ok_or_else(|| IndexError::NotFound(id.to_string()).into())
    }

    /// Stores a new document; an existing `id` is a conflict.
    pub async fn create(&self, id: &str, document: Document) -> Result<DocVersion, ProcessorError> {
        let version = self.index.create(id, document).await?;
        info!(id, %version, "challenge document created");
        Ok(version)
    }

    /// Applies `update` to an existing document. With `expected` set the
    /// write is rejected if the document changed since it was read.
    pub async fn update(
        &self,
        id: &str,
        update: impl Into<PartialUpdate>,
        expected: Option<DocVersion>,
    ) -> Result<DocVersion, ProcessorError> {
        let update = update.into();
        let fields: Vec<&str> = update.fields().collect();
        debug!(id, ?fields, conditional = expected.is_some(), "applying partial update");
        let version = self.index.update(id, update, expected).await?;
        info!(id, %version, "challenge document updated");
        Ok(version)
    }
}
