use chip_index::{Document, IndexError, PartialUpdate};
use chip_models::{ChallengeCreate, ChallengeUpdate, Timestamp};
use tracing::{debug, instrument};

use super::{HandlerContext, Outcome};
use crate::aggregation::{
    CHECKPOINT_SUBMISSIONS_FIELD, REGISTRANTS_ALIAS_FIELD, REGISTRANTS_FIELD, SUBMISSIONS_FIELD,
};
use crate::error::ProcessorError;
use crate::timeline::Timeline;

/// Never taken from a payload; only the timeline and the aggregation write these.
const DERIVED_FIELDS: [&str; 7] = [
    "endDate",
    "currentPhase",
    "currentPhaseNames",
    REGISTRANTS_FIELD,
    REGISTRANTS_ALIAS_FIELD,
    SUBMISSIONS_FIELD,
    CHECKPOINT_SUBMISSIONS_FIELD,
];

fn strip_derived(document: &mut Document) {
    for field in DERIVED_FIELDS {
        if document.remove(field).is_some() {
            debug!(field, "derived field in payload dropped");
        }
    }
}

#[instrument(skip_all, fields(challenge_id = %update.id))]
pub async fn update(
    ctx: &HandlerContext,
    update: &ChallengeUpdate,
    raw: Document,
) -> Result<Outcome, ProcessorError> {
    let mut partial = raw;
    strip_derived(&mut partial);
    let mut partial = PartialUpdate::from(partial);

    let mut expected = None;
    if let Some(phases) = &update.phases {
        let start_date = match update.start_date {
            Some(start) => Some(start),
            None => {
                let stored = ctx.mutator.read_versioned(&update.id).await?;
                expected = Some(stored.version);
                stored.source.get("startDate").and_then(Timestamp::from_value)
            }
        };
        if start_date.is_none() {
            debug!("no start date known, end date left as is");
        }
        let timeline = Timeline::compute(phases, start_date)?;
        partial.extend(timeline.to_update().map_err(IndexError::from)?);
    }

    let version = ctx.mutator.update(&update.id, partial, expected).await?;
    Ok(Outcome::Applied {
        challenge_id: update.id.clone(),
        version,
    })
}

#[instrument(skip_all, fields(challenge_id = %create.id))]
pub async fn create(
    ctx: &HandlerContext,
    create: &ChallengeCreate,
    raw: Document,
) -> Result<Outcome, ProcessorError> {
    let mut document = raw;
    strip_derived(&mut document);
    let timeline = Timeline::compute(&create.phases, create.start_date)?;
    document.extend(timeline.to_update().map_err(IndexError::from)?.into_document());

    let version = ctx.mutator.create(&create.id, document).await?;
    Ok(Outcome::Applied {
        challenge_id: create.id.clone(),
        version,
    })
}
