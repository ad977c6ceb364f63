use chip_index::Document;
use chip_models::{EventKind, SubmissionPayload};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{HandlerContext, Outcome, SkipReason};
use crate::aggregation::{CHECKPOINT_SUBMISSIONS_FIELD, SUBMISSIONS_FIELD};
use crate::error::ProcessorError;

#[instrument(skip_all, fields(kind = %kind, submission_id = %payload.id))]
pub async fn handle(
    ctx: &HandlerContext,
    kind: EventKind,
    payload: &SubmissionPayload,
) -> Result<Outcome, ProcessorError> {
    if !payload.is_submission() {
        info!(resource = %payload.resource, "not a submission resource, ignored");
        return Ok(Outcome::Skipped {
            reason: SkipReason::NotASubmission {
                resource: payload.resource.clone(),
            },
        });
    }

    let challenge = match &payload.challenge_id {
        Some(challenge) => challenge.clone(),
        None => {
            debug!("payload has no challengeId, looking up the submission");
            ctx.fetcher.challenge_of_submission(&payload.id).await?
        }
    };
    let challenge_id = ctx.fetcher.resolve_challenge_id(&challenge).await?;

    // a removed submission must not be counted back in
    let observed = if kind.is_removal() {
        None
    } else {
        payload
            .submission_type
            .as_deref()
            .and_then(|label| ctx.fetcher.categorize(label))
    };
    let counts = ctx.fetcher.submission_counts(&challenge_id, observed).await?;

    let mut partial = Document::new();
    partial.insert(SUBMISSIONS_FIELD.into(), Value::from(counts.contest));
    partial.insert(
        CHECKPOINT_SUBMISSIONS_FIELD.into(),
        Value::from(counts.checkpoint),
    );
    let version = ctx.mutator.update(&challenge_id, partial, None).await?;
    Ok(Outcome::Applied {
        challenge_id,
        version,
    })
}
