use chip_index::Document;
use chip_models::{EventKind, ResourcePayload};
use serde_json::Value;
use tracing::{info, instrument};

use super::{HandlerContext, Outcome, SkipReason};
use crate::aggregation::{REGISTRANTS_ALIAS_FIELD, REGISTRANTS_FIELD};
use crate::error::ProcessorError;

#[instrument(
    skip_all,
    fields(kind = %kind, challenge_id = %payload.challenge_id, role_id = %payload.role_id)
)]
pub async fn handle(
    ctx: &HandlerContext,
    kind: EventKind,
    payload: &ResourcePayload,
) -> Result<Outcome, ProcessorError> {
    if let Some(role) = ctx.fetcher.registrant_role() {
        if payload.role_id != role {
            info!(registrant_role = role, "resource is not a registrant, ignored");
            return Ok(Outcome::Skipped {
                reason: SkipReason::RoleMismatch {
                    role_id: payload.role_id.clone(),
                },
            });
        }
    }

    let challenge_id = ctx.fetcher.resolve_challenge_id(&payload.challenge_id).await?;
    let count = ctx.fetcher.registrant_count(&challenge_id).await?;
    let mut partial = Document::new();
    partial.insert(REGISTRANTS_FIELD.into(), Value::from(count));
    partial.insert(REGISTRANTS_ALIAS_FIELD.into(), Value::from(count));

    let version = ctx.mutator.update(&challenge_id, partial, None).await?;
    Ok(Outcome::Applied {
        challenge_id,
        version,
    })
}
