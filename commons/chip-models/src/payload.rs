use serde::Deserialize;
use validator::Validate;

use crate::challenge::{ChallengeRef, MemberId, validate_member_id};
use crate::validation::{not_blank, validate_uuid};

/// The resource tag a submission payload must carry to be counted.
pub const SUBMISSION_RESOURCE: &str = "submission";

/// Membership of a member in a challenge under a role.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePayload {
    #[serde(default)]
    pub id: Option<String>,
    pub challenge_id: ChallengeRef,
    #[validate(custom(function = "validate_member_id"))]
    pub member_id: MemberId,
    #[validate(custom(function = "validate_uuid"))]
    pub role_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    #[validate(custom(function = "not_blank"))]
    pub resource: String,
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    /// Absent on some removal notifications; resolved from the submission record.
    #[serde(default)]
    pub challenge_id: Option<ChallengeRef>,
    #[serde(default, rename = "type")]
    pub submission_type: Option<String>,
    #[serde(default)]
    pub member_id: Option<MemberId>,
}

impl SubmissionPayload {
    pub fn is_submission(&self) -> bool {
        self.resource == SUBMISSION_RESOURCE
    }
}
