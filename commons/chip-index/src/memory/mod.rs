use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::IndexError;
use crate::merge::apply_update;
use crate::traits::*;

const PRIMARY_TERM: u64 = 1;

#[derive(Debug, Clone)]
struct StoredDocument {
    version: DocVersion,
    source: Document,
}

type MemoryStore = Arc<RwLock<HashMap<String, StoredDocument>>>;

/// In-process index. Every write is visible as soon as the call returns.
#[derive(Clone, Default)]
pub struct MemoryChallengeIndex {
    store: MemoryStore,
    seq_no: Arc<AtomicU64>,
}

impl MemoryChallengeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_version(&self) -> DocVersion {
        DocVersion {
            seq_no: self.seq_no.fetch_add(1, Ordering::SeqCst),
            primary_term: PRIMARY_TERM,
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl ChallengeIndex for MemoryChallengeIndex {
    async fn get(&self, id: &str) -> IndexResult<Option<VersionedDocument>> {
        let store = self.store.read().await;
        Ok(store.get(id).map(|stored| VersionedDocument {
            id: id.to_string(),
            version: stored.version,
            source: stored.source.clone(),
        }))
    }

    async fn create(&self, id: &str, document: Document) -> IndexResult<DocVersion> {
        let mut store = self.store.write().await;
        if store.contains_key(id) {
            return Err(IndexError::Conflict(id.to_string()));
        }
        let version = self.next_version();
        store.insert(
            id.to_string(),
            StoredDocument {
                version,
                source: document,
            },
        );
        debug!(id, %version, "created document");
        Ok(version)
    }

    async fn update(
        &self,
        id: &str,
        update: PartialUpdate,
        if_version: Option<DocVersion>,
    ) -> IndexResult<DocVersion> {
        let mut store = self.store.write().await;
        let stored = store
            .get_mut(id)
            .ok_or_else(|| IndexError::NotFound(id.to_string()))?;
        if let Some(expected) = if_version {
            if stored.version != expected {
                return Err(IndexError::VersionConflict {
                    id: id.to_string(),
                    expected: expected.to_string(),
                });
            }
        }
        apply_update(&mut stored.source, update);
        stored.version = self.next_version();
        debug!(id, version = %stored.version, "updated document");
        Ok(stored.version)
    }

    async fn delete(&self, id: &str) -> IndexResult<()> {
        let mut store = self.store.write().await;
        store
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| IndexError::NotFound(id.to_string()))
    }

    async fn health(&self) -> IndexResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_twice_conflicts() {
        let index = MemoryChallengeIndex::new();
        index
            .create("c1", doc(json!({"name": "a"})))
            .await
            .unwrap();
        let err = index
            .create("c1", doc(json!({"name": "b"})))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Conflict(id) if id == "c1"));
        let stored = index.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.source.get("name"), Some(&json!("a")));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let index = MemoryChallengeIndex::new();
        let err = index
            .update("nope", doc(json!({"name": "x"})).into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn conditional_update_detects_concurrent_write() {
        let index = MemoryChallengeIndex::new();
        index
            .create("c1", doc(json!({"n": 1})))
            .await
            .unwrap();
        let read = index.get("c1").await.unwrap().unwrap();

        index
            .update("c1", doc(json!({"n": 2})).into(), None)
            .await
            .unwrap();

        let err = index
            .update("c1", doc(json!({"n": 3})).into(), Some(read.version))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::VersionConflict { .. }));

        let fresh = index.get("c1").await.unwrap().unwrap();
        let version = index
            .update("c1", doc(json!({"n": 3})).into(), Some(fresh.version))
            .await
            .unwrap();
        assert!(version.seq_no > fresh.version.seq_no);
        assert_eq!(index.get("c1").await.unwrap().unwrap().source["n"], json!(3));
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let index = MemoryChallengeIndex::new();
        index
            .create("c1", Document::new())
            .await
            .unwrap();
        index.delete("c1").await.unwrap();
        assert!(index.get("c1").await.unwrap().is_none());
        assert!(matches!(
            index.delete("c1").await,
            Err(IndexError::NotFound(_))
        ));
        assert_eq!(index.len().await, 0);
    }
}
