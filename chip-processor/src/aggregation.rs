use std::collections::HashMap;

use chip_models::ChallengeRef;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::conf::{AggregationMode, ProcessorConfig};
use crate::error::{ProcessorError, UpstreamError};
use crate::upstream::UpstreamClient;

pub const REGISTRANTS_FIELD: &str = "numOfRegistrants";
/// Older readers of the index use this spelling.
pub const REGISTRANTS_ALIAS_FIELD: &str = "numberOfRegistrants";
pub const SUBMISSIONS_FIELD: &str = "numOfSubmissions";
pub const CHECKPOINT_SUBMISSIONS_FIELD: &str = "numOfCheckpointSubmissions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionCategory {
    Contest,
    Checkpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmissionCounts {
    pub contest: u64,
    pub checkpoint: u64,
}

impl SubmissionCounts {
    /// Raises the count of the just-observed category to at least one, since
    /// the upstream aggregate may not include that submission yet.
    pub fn bridge(mut self, observed: Option<SubmissionCategory>) -> Self {
        match observed {
            Some(SubmissionCategory::Contest) => self.contest = self.contest.max(1),
            Some(SubmissionCategory::Checkpoint) => {
                self.checkpoint = self.checkpoint.max(1)
            }
            None => {}
        }
        self
    }
}

/// Recomputes derived counts from the upstream systems of record.
#[derive(Clone)]
pub struct AggregationFetcher {
    upstream: UpstreamClient,
    mode: AggregationMode,
    registrant_role: Option<String>,
    contest_type: String,
    contest_alias: String,
    checkpoint_type: String,
}

impl AggregationFetcher {
    pub fn new(upstream: UpstreamClient, config: &ProcessorConfig) -> Self {
        Self {
            upstream,
            mode: config.aggregation_mode,
            registrant_role: config.registrant_role().map(str::to_string),
            contest_type: config.contest_submission_type.clone(),
            contest_alias: config.challenge_submission_type.clone(),
            checkpoint_type: config.checkpoint_submission_type.clone(),
        }
    }

    pub fn registrant_role(&self) -> Option<&str> {
        self.registrant_role.as_deref()
    }

    pub fn categorize(&self, submission_type: &str) -> Option<SubmissionCategory> {
        if submission_type == self.contest_type || submission_type == self.contest_alias {
            Some(SubmissionCategory::Contest)
        } else if submission_type == self.checkpoint_type {
            Some(SubmissionCategory::Checkpoint)
        } else {
            None
        }
    }

    #[instrument(skip(self))]
    pub async fn registrant_count(&self, challenge_id: &str) -> Result<u64, ProcessorError> {
        let role = self.registrant_role();
        let count = match self.mode {
            AggregationMode::Count => {
                let counts = self.upstream.resource_counts(challenge_id, role).await?;
                match role {
                    Some(role) => match counts.get(role) {
                        Some(value) => non_negative(REGISTRANTS_FIELD, *value)?,
                        None => 0,
                    },
                    None => sum_counts(REGISTRANTS_FIELD, counts.values().copied())?,
                }
            }
            AggregationMode::Paged => {
                let resources = self.upstream.list_resources(challenge_id, role).await?;
                resources
                    .iter()
                    .filter(|r| match role {
                        Some(role) => r.get("roleId").and_then(Value::as_str) == Some(role),
                        None => true,
                    })
                    .count() as u64
            }
        };
        debug!(challenge_id, count, "registrant count");
        Ok(count)
    }

    /// Current submission counts. `observed` is the category of the submission
    /// that triggered the recompute, if it should be counted regardless.
    #[instrument(skip(self))]
    pub async fn submission_counts(
        &self,
        challenge_id: &str,
        observed: Option<SubmissionCategory>,
    ) -> Result<SubmissionCounts, ProcessorError> {
        let counts = match self.mode {
            AggregationMode::Count => {
                let by_type = self.upstream.submission_counts(challenge_id).await?;
                self.tally_count_map(&by_type)?
            }
            AggregationMode::Paged => {
                let submissions = self.upstream.list_submissions(challenge_id).await?;
                self.tally_records(&submissions)
            }
        };
        let counts = counts.bridge(observed);
        debug!(
            challenge_id,
            contest = counts.contest,
            checkpoint = counts.checkpoint,
            "submission counts"
        );
        Ok(counts)
    }

    fn tally_count_map(
        &self,
        by_type: &HashMap<String, i64>,
    ) -> Result<SubmissionCounts, ProcessorError> {
        let mut counts = SubmissionCounts::default();
        for (label, value) in by_type {
            match self.categorize(label) {
                Some(SubmissionCategory::Contest) => {
                    counts.contest += non_negative(SUBMISSIONS_FIELD, *value)?
                }
                Some(SubmissionCategory::Checkpoint) => {
                    counts.checkpoint +=
                        non_negative(CHECKPOINT_SUBMISSIONS_FIELD, *value)?
                }
                None => {}
            }
        }
        Ok(counts)
    }

    fn tally_records(&self, submissions: &[Value]) -> SubmissionCounts {
        let mut counts = SubmissionCounts::default();
        for submission in submissions {
            let label = submission.get("type").and_then(Value::as_str);
            match label.and_then(|l| self.categorize(l)) {
                Some(SubmissionCategory::Contest) => counts.contest += 1,
                Some(SubmissionCategory::Checkpoint) => counts.checkpoint += 1,
                None => {}
            }
        }
        counts
    }

    /// Turns a legacy numeric id into the canonical challenge id.
    pub async fn resolve_challenge_id(
        &self,
        challenge: &ChallengeRef,
    ) -> Result<String, ProcessorError> {
        match challenge {
            ChallengeRef::Canonical(id) => Ok(id.clone()),
            ChallengeRef::Legacy(legacy_id) => {
                debug!(legacy_id, "resolving legacy challenge id");
                Ok(self.upstream.challenge_by_legacy_id(*legacy_id).await?)
            }
        }
    }

    /// Challenge reference recorded on the submission with `submission_id`.
    pub async fn challenge_of_submission(
        &self,
        submission_id: &str,
    ) -> Result<ChallengeRef, ProcessorError> {
        let record = self.upstream.submission_by_id(submission_id).await?;
        let raw = record.get("challengeId").cloned().ok_or_else(|| {
            UpstreamError::Decode {
                url: format!("submission {submission_id}"),
                reason: "record has no challengeId".to_string(),
            }
        })?;
        serde_json::from_value(raw).map_err(|e| {
            UpstreamError::Decode {
                url: format!("submission {submission_id}"),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

fn non_negative(field: &str, value: i64) -> Result<u64, ProcessorError> {
    u64::try_from(value).map_err(|_| ProcessorError::NegativeCount {
        field: field.to_string(),
        value,
    })
}

fn sum_counts(
    field: &str,
    values: impl Iterator<Item = i64>,
) -> Result<u64, ProcessorError> {
    values.map(|v| non_negative(field, v)).sum()
}
