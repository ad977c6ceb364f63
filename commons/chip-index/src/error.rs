#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    Conflict(String),

    #[error("Document {id} was modified concurrently (expected {expected})")]
    VersionConflict { id: String, expected: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Index backend error: {0}")]
    Backend(String),
}

impl IndexError {
    /// Whether a later attempt of the same write could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IndexError::VersionConflict { .. }
                | IndexError::Connection(_)
                | IndexError::Timeout(_)
                | IndexError::Backend(_)
                | IndexError::NotFound(_)
        )
    }
}
