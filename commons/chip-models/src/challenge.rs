use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::time::Timestamp;
use crate::validation::{ValidationError, is_uuid, not_blank, validate_uuid};

/// A timed stage of a challenge, optionally chained to a predecessor phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_uuid"))]
    pub predecessor: Option<String>,
    #[serde(default)]
    pub is_open: bool,
    /// Seconds.
    #[validate(range(exclusive_min = 0.0, message = "must be a positive number"))]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_end_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end_date: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Phase {
    pub fn start_date(&self) -> Option<Timestamp> {
        self.actual_start_date.or(self.scheduled_start_date)
    }

    pub fn end_date(&self) -> Option<Timestamp> {
        self.actual_end_date.or(self.scheduled_end_date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ChallengeSetting {
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_uuid"))]
    pub setting_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Prize {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[validate(custom(function = "not_blank"))]
    pub prize_type: String,
    #[validate(range(exclusive_min = 0.0, message = "must be a positive number"))]
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PrizeSet {
    #[serde(rename = "type")]
    #[validate(custom(function = "not_blank"))]
    pub set_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "must contain at least 1 items"), nested)]
    pub prizes: Vec<Prize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[validate(range(min = 1, message = "must be a positive number"))]
    pub file_size: i64,
    #[validate(custom(function = "not_blank"))]
    pub file_name: String,
    #[validate(custom(function = "validate_uuid"))]
    pub challenge_id: String,
}

fn unique_setting_types(
    settings: &[ChallengeSetting],
) -> Result<(), validator::ValidationError> {
    let mut seen = HashSet::new();
    if settings.iter().all(|s| seen.insert(s.setting_type.as_str())) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("unique")
            .with_message(Cow::Borrowed("contains a duplicate value")))
    }
}

fn each_not_blank(items: &[String]) -> Result<(), validator::ValidationError> {
    items.iter().try_for_each(|item| not_blank(item))
}

/// Partial challenge state carried by a challenge-update event.
///
/// Only the fields that need checking are typed here; the raw payload is
/// what gets merged into the stored document.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeUpdate {
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[validate(custom(function = "validate_uuid"))]
    pub type_id: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub track: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "unique_setting_types"), nested)]
    pub challenge_settings: Option<Vec<ChallengeSetting>>,
    #[validate(custom(function = "validate_uuid"))]
    pub timeline_template_id: Option<String>,
    #[validate(nested)]
    pub phases: Option<Vec<Phase>>,
    #[validate(nested)]
    pub prize_sets: Option<Vec<PrizeSet>>,
    pub review_type: Option<String>,
    pub tags: Option<Vec<String>>,
    #[validate(range(min = 1, message = "must be a positive number"))]
    pub project_id: Option<i64>,
    #[validate(range(min = 1, message = "must be a positive number"))]
    pub forum_id: Option<i64>,
    #[validate(range(min = 1, message = "must be a positive number"))]
    pub legacy_id: Option<i64>,
    pub status: Option<String>,
    #[validate(nested)]
    pub attachments: Option<Vec<Attachment>>,
    pub groups: Option<Vec<String>>,
    pub start_date: Option<Timestamp>,
    pub created: Option<Timestamp>,
    pub created_by: Option<String>,
    pub updated: Timestamp,
    #[validate(custom(function = "not_blank"))]
    pub updated_by: String,
}

/// Full challenge state carried by a challenge-create event.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeCreate {
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[validate(custom(function = "validate_uuid"))]
    pub type_id: String,
    #[validate(custom(function = "not_blank"))]
    pub track: String,
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    #[validate(custom(function = "unique_setting_types"), nested)]
    pub challenge_settings: Option<Vec<ChallengeSetting>>,
    #[validate(custom(function = "validate_uuid"))]
    pub timeline_template_id: String,
    #[validate(length(min = 1, message = "must contain at least 1 items"), nested)]
    pub phases: Vec<Phase>,
    #[validate(length(min = 1, message = "must contain at least 1 items"), nested)]
    pub prize_sets: Vec<PrizeSet>,
    #[validate(custom(function = "not_blank"))]
    pub review_type: String,
    #[validate(
        length(min = 1, message = "must contain at least 1 items"),
        custom(function = "each_not_blank")
    )]
    pub tags: Vec<String>,
    #[validate(range(min = 1, message = "must be a positive number"))]
    pub project_id: i64,
    #[validate(range(min = 1, message = "must be a positive number"))]
    pub forum_id: Option<i64>,
    #[validate(range(min = 1, message = "must be a positive number"))]
    pub legacy_id: Option<i64>,
    #[validate(custom(function = "not_blank"))]
    pub status: String,
    pub groups: Option<Vec<String>>,
    pub start_date: Option<Timestamp>,
    pub created: Timestamp,
    #[validate(custom(function = "not_blank"))]
    pub created_by: String,
}

/// Challenge identifier as it may arrive from upstream systems.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChallengeRef {
    Canonical(String),
    Legacy(i64),
}

impl ChallengeRef {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if is_uuid(trimmed) {
            return Ok(ChallengeRef::Canonical(trimmed.to_string()));
        }
        match trimmed.parse::<i64>() {
            Ok(id) if id > 0 => Ok(ChallengeRef::Legacy(id)),
            _ => Err(ValidationError::ChallengeRef(raw.to_string())),
        }
    }
}

impl fmt::Display for ChallengeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeRef::Canonical(id) => f.write_str(id),
            ChallengeRef::Legacy(id) => write!(f, "{id}"),
        }
    }
}

impl<'de> Deserialize<'de> for ChallengeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(id) if id > 0 => Ok(ChallengeRef::Legacy(id)),
            Raw::Number(id) => Err(serde::de::Error::custom(
                ValidationError::ChallengeRef(id.to_string()),
            )),
            Raw::Text(text) => {
                ChallengeRef::parse(&text).map_err(serde::de::Error::custom)
            }
        }
    }
}

/// Member identifier; numeric in current payloads, a handle in older ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberId {
    Numeric(i64),
    Handle(String),
}

pub(crate) fn validate_member_id(
    member: &MemberId,
) -> Result<(), validator::ValidationError> {
    let ok = match member {
        MemberId::Numeric(id) => *id > 0,
        MemberId::Handle(handle) => !handle.trim().is_empty(),
    };
    if ok {
        Ok(())
    } else {
        Err(validator::ValidationError::new("member")
            .with_message(Cow::Borrowed("must be a positive number or a non-empty handle")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CHALLENGE: &str = "7b37a31e-484c-4d1e-aa9f-cfd6656e11d8";

    #[test]
    fn challenge_ref_accepts_uuid_and_legacy_forms() {
        assert_eq!(
            ChallengeRef::parse(CHALLENGE).unwrap(),
            ChallengeRef::Canonical(CHALLENGE.into())
        );
        assert_eq!(ChallengeRef::parse("30054522").unwrap(), ChallengeRef::Legacy(30054522));
        assert!(ChallengeRef::parse("abc").is_err());
        let from_number: ChallengeRef = serde_json::from_value(json!(30054522)).unwrap();
        assert_eq!(from_number, ChallengeRef::Legacy(30054522));
        assert!(serde_json::from_value::<ChallengeRef>(json!(-3)).is_err());
    }

    #[test]
    fn phase_keeps_unknown_fields_and_prefers_actual_dates() {
        let phase: Phase = serde_json::from_value(json!({
            "id": "aa2c1d2e-1234-4d1e-aa9f-cfd6656e11d8",
            "name": "Registration",
            "isOpen": true,
            "duration": 100,
            "isActive": true,
            "scheduledStartDate": "2020-01-01T00:00:00Z",
            "actualStartDate": "2020-01-02T00:00:00Z",
            "scheduledEndDate": "2020-01-03T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(phase.extra.get("isActive"), Some(&json!(true)));
        assert_eq!(phase.start_date().unwrap().to_iso(), "2020-01-02T00:00:00.000Z");
        assert_eq!(phase.end_date().unwrap().to_iso(), "2020-01-03T00:00:00.000Z");
        assert!(phase.validate().is_ok());
    }

    #[test]
    fn duplicate_setting_types_are_rejected() {
        let ty = "c2c1d2e1-1234-4d1e-aa9f-cfd6656e11d8";
        let update: ChallengeUpdate = serde_json::from_value(json!({
            "id": CHALLENGE,
            "challengeSettings": [{"type": ty, "value": "a"}, {"type": ty, "value": "b"}],
            "updated": "2019-02-04T01:01:00",
            "updatedBy": "user"
        }))
        .unwrap();
        let err: ValidationError = update.validate().unwrap_err().into();
        assert!(err.to_string().contains("contains a duplicate value"));
    }
}
