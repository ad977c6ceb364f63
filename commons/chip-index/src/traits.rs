use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IndexError;

pub type IndexResult<T> = Result<T, IndexError>;

/// A challenge document as stored in the index: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Optimistic-concurrency token handed out with every read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocVersion {
    pub seq_no: u64,
    pub primary_term: u64,
}

impl fmt::Display for DocVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq_no={} primary_term={}", self.seq_no, self.primary_term)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDocument {
    pub id: String,
    pub version: DocVersion,
    pub source: Document,
}

/// Fields to write into a stored document.
///
/// `merge` keys follow the index's partial `doc` semantics: nested objects
/// merge key by key, everything else is replaced. `replace` keys overwrite
/// the stored value wholesale, so nothing of an earlier object survives.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartialUpdate {
    pub merge: Document,
    pub replace: Document,
}

impl PartialUpdate {
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.merge.keys().chain(self.replace.keys()).map(String::as_str)
    }

    /// Folds `other` in; its keys win over ours in either half.
    pub fn extend(&mut self, other: PartialUpdate) {
        for key in other.merge.keys().chain(other.replace.keys()) {
            self.merge.remove(key);
            self.replace.remove(key);
        }
        self.merge.extend(other.merge);
        self.replace.extend(other.replace);
    }

    /// Flattens both halves into one document, for writes with nothing to merge into.
    pub fn into_document(self) -> Document {
        let mut document = self.merge;
        document.extend(self.replace);
        document
    }
}

impl From<Document> for PartialUpdate {
    fn from(merge: Document) -> Self {
        Self {
            merge,
            replace: Document::new(),
        }
    }
}

#[async_trait]
pub trait ChallengeIndex: Send + Sync {
    async fn get(&self, id: &str) -> IndexResult<Option<VersionedDocument>>;

    /// Stores a new document; fails with [`IndexError::Conflict`] if `id` exists.
    async fn create(&self, id: &str, document: Document) -> IndexResult<DocVersion>;

    /// Applies `update` to the stored document. Fails with
    /// [`IndexError::NotFound`] if `id` is absent and
    /// [`IndexError::VersionConflict`] if `if_version` no longer matches.
    ///
    /// Writes are visible to readers when the call returns.
    async fn update(
        &self,
        id: &str,
        update: PartialUpdate,
        if_version: Option<DocVersion>,
    ) -> IndexResult<DocVersion>;

    async fn delete(&self, id: &str) -> IndexResult<()>;

    /// Lightweight connectivity check to the backing store.
    async fn health(&self) -> IndexResult<()>;
}
