pub mod challenge;
pub mod resource;
pub mod submission;

use chip_index::DocVersion;
use serde::Serialize;

use crate::aggregation::AggregationFetcher;
use crate::mutator::DocumentMutator;

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct HandlerContext {
    pub mutator: DocumentMutator,
    pub fetcher: AggregationFetcher,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Applied {
        challenge_id: String,
        version: DocVersion,
    },
    Skipped { reason: SkipReason },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }
}

/// Declared no-op preconditions; the message is acknowledged without a write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    RoleMismatch { role_id: String },
    NotASubmission { resource: String },
}
