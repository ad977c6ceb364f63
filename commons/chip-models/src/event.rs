use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use crate::challenge::{ChallengeCreate, ChallengeUpdate};
use crate::payload::{ResourcePayload, SubmissionPayload};
use crate::time::Timestamp;
use crate::validation::{
    ValidationError, require_date, require_object, require_str,
};

/// Logical category of an inbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ChallengeCreate,
    ChallengeUpdate,
    ResourceCreate,
    ResourceUpdate,
    ResourceDelete,
    SubmissionCreate,
    SubmissionUpdate,
    SubmissionDelete,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::ChallengeCreate,
        EventKind::ChallengeUpdate,
        EventKind::ResourceCreate,
        EventKind::ResourceUpdate,
        EventKind::ResourceDelete,
        EventKind::SubmissionCreate,
        EventKind::SubmissionUpdate,
        EventKind::SubmissionDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ChallengeCreate => "challenge-create",
            EventKind::ChallengeUpdate => "challenge-update",
            EventKind::ResourceCreate => "resource-create",
            EventKind::ResourceUpdate => "resource-update",
            EventKind::ResourceDelete => "resource-delete",
            EventKind::SubmissionCreate => "submission-create",
            EventKind::SubmissionUpdate => "submission-update",
            EventKind::SubmissionDelete => "submission-delete",
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, EventKind::ResourceDelete | EventKind::SubmissionDelete)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery metadata common to every notification.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub topic: String,
    pub originator: String,
    pub timestamp: Timestamp,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub enum EventPayload {
    ChallengeCreate(ChallengeCreate),
    ChallengeUpdate(ChallengeUpdate),
    Resource(ResourcePayload),
    Submission(SubmissionPayload),
}

/// A notification that passed validation for its kind.
#[derive(Debug, Clone)]
pub struct ChallengeEvent {
    pub kind: EventKind,
    pub envelope: EventEnvelope,
    pub payload: EventPayload,
    /// Payload exactly as received; pass-through fields are merged from here.
    pub raw_payload: Map<String, Value>,
}

impl ChallengeEvent {
    /// Checks the envelope and the payload contract of `kind`.
    pub fn decode(kind: EventKind, message: &Value) -> Result<Self, ValidationError> {
        let object = message
            .as_object()
            .ok_or_else(|| ValidationError::NotAnObject("message".into()))?;

        let envelope = EventEnvelope {
            topic: require_str(object, "topic")?.to_string(),
            originator: require_str(object, "originator")?.to_string(),
            timestamp: require_date(object, "timestamp")?,
            mime_type: require_str(object, "mime-type")?.to_string(),
        };
        let raw_payload = require_object(object, "payload")?.clone();

        let payload = match kind {
            EventKind::ChallengeCreate => {
                EventPayload::ChallengeCreate(decode_payload(kind, &raw_payload)?)
            }
            EventKind::ChallengeUpdate => {
                EventPayload::ChallengeUpdate(decode_payload(kind, &raw_payload)?)
            }
            EventKind::ResourceCreate
            | EventKind::ResourceUpdate
            | EventKind::ResourceDelete => {
                EventPayload::Resource(decode_payload(kind, &raw_payload)?)
            }
            EventKind::SubmissionCreate
            | EventKind::SubmissionUpdate
            | EventKind::SubmissionDelete => {
                EventPayload::Submission(decode_payload(kind, &raw_payload)?)
            }
        };

        Ok(Self {
            kind,
            envelope,
            payload,
            raw_payload,
        })
    }
}

fn decode_payload<T>(
    kind: EventKind,
    raw: &Map<String, Value>,
) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let typed: T = serde_json::from_value(Value::Object(raw.clone())).map_err(|e| {
        ValidationError::Payload {
            kind,
            reason: e.to_string(),
        }
    })?;
    typed.validate()?;
    Ok(typed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::ChallengeRef;
    use serde_json::json;

    const CHALLENGE: &str = "7b37a31e-484c-4d1e-aa9f-cfd6656e11d8";
    const PHASE_1: &str = "aa2c1d2e-1234-4d1e-aa9f-cfd6656e11d8";
    const PHASE_2: &str = "bb2c1d2e-1234-4d1e-aa9f-cfd6656e11d8";

    fn update_message() -> Value {
        json!({
            "topic": "challenge.notification.update",
            "originator": "challenge-api",
            "timestamp": "2019-02-04T01:01:00",
            "mime-type": "application/json",
            "payload": {
                "id": CHALLENGE,
                "name": "test challenge 2",
                "phases": [
                    {"id": PHASE_1, "isOpen": false, "duration": 100},
                    {"id": PHASE_2, "predecessor": PHASE_1, "isOpen": true, "duration": 200}
                ],
                "prizeSets": [{"type": "Challenge prizes", "prizes": [{"type": "winning", "value": 800}]}],
                "forumId": 456456,
                "someFutureField": {"nested": true},
                "updated": "2019-02-04T01:01:00",
                "updatedBy": "user"
            }
        })
    }

    fn expect_err(message: &Value, kind: EventKind, fragment: &str) {
        let err = ChallengeEvent::decode(kind, message).unwrap_err();
        assert!(
            err.to_string().contains(fragment),
            "expected `{fragment}` in `{err}`"
        );
    }

    fn expect_err_on(message: &Value, kind: EventKind, field: &str, constraint: &str) {
        let err = ChallengeEvent::decode(kind, message).unwrap_err().to_string();
        assert!(err.to_lowercase().contains(field), "expected `{field}` in `{err}`");
        assert!(err.contains(constraint), "expected `{constraint}` in `{err}`");
    }

    #[test]
    fn decodes_update_and_keeps_unknown_fields() {
        let event = ChallengeEvent::decode(EventKind::ChallengeUpdate, &update_message()).unwrap();
        assert_eq!(event.envelope.topic, "challenge.notification.update");
        assert!(event.raw_payload.contains_key("someFutureField"));
        match event.payload {
            EventPayload::ChallengeUpdate(update) => {
                assert_eq!(update.id, CHALLENGE);
                assert_eq!(update.phases.unwrap().len(), 2);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn envelope_errors_name_the_field() {
        expect_err(&json!({}), EventKind::ChallengeUpdate, "\"topic\" is required");

        let mut msg = update_message();
        msg["topic"] = Value::Null;
        expect_err(&msg, EventKind::ChallengeUpdate, "\"topic\" must be a string");

        let mut msg = update_message();
        msg["originator"] = json!({"a": 1});
        expect_err(&msg, EventKind::ChallengeUpdate, "\"originator\" must be a string");

        let mut msg = update_message();
        msg["timestamp"] = json!("abc");
        expect_err(
            &msg,
            EventKind::ChallengeUpdate,
            "\"timestamp\" must be a number of milliseconds or valid date string",
        );

        let mut msg = update_message();
        msg["mime-type"] = json!(123);
        expect_err(&msg, EventKind::ChallengeUpdate, "\"mime-type\" must be a string");

        let mut msg = update_message();
        msg.as_object_mut().unwrap().remove("payload");
        expect_err(&msg, EventKind::ChallengeUpdate, "\"payload\" is required");
    }

    #[test]
    fn payload_constraints_are_enforced() {
        let mut msg = update_message();
        msg["payload"]["phases"][0]["duration"] = json!(0);
        expect_err(&msg, EventKind::ChallengeUpdate, "\"duration\" must be a positive number");

        let mut msg = update_message();
        msg["payload"]["prizeSets"][0]["prizes"][0]["value"] = json!(-2);
        expect_err(&msg, EventKind::ChallengeUpdate, "\"value\" must be a positive number");

        let mut msg = update_message();
        msg["payload"]["id"] = json!("abc");
        expect_err(&msg, EventKind::ChallengeUpdate, "\"id\" must be a valid GUID");

        let mut msg = update_message();
        msg["payload"].as_object_mut().unwrap().remove("updatedBy");
        expect_err(&msg, EventKind::ChallengeUpdate, "updatedBy");

        let mut msg = update_message();
        msg["payload"]["forumId"] = json!(-1);
        expect_err_on(&msg, EventKind::ChallengeUpdate, "forum", "must be a positive number");
    }

    #[test]
    fn submission_and_resource_payloads() {
        let submission = json!({
            "topic": "submission.notification.delete",
            "originator": "submission-api",
            "timestamp": 1580000000000i64,
            "mime-type": "application/json",
            "payload": {
                "resource": "submission",
                "id": "171233d3-019e-4033-b1cf-d7205c7f773a"
            }
        });
        let event = ChallengeEvent::decode(EventKind::SubmissionDelete, &submission).unwrap();
        match event.payload {
            EventPayload::Submission(payload) => {
                assert!(payload.is_submission());
                assert!(payload.challenge_id.is_none());
            }
            other => panic!("unexpected payload {other:?}"),
        }

        let resource = json!({
            "topic": "challenge.action.resource.create",
            "originator": "resource-api",
            "timestamp": "2020-01-02T12:11:11",
            "mime-type": "application/json",
            "payload": {
                "challengeId": CHALLENGE,
                "memberId": 123,
                "roleId": "not-a-guid"
            }
        });
        expect_err_on(&resource, EventKind::ResourceCreate, "role", "must be a valid GUID");

        let mut legacy = resource.clone();
        legacy["payload"]["challengeId"] = json!(30054522);
        legacy["payload"]["roleId"] = json!(CHALLENGE);
        match ChallengeEvent::decode(EventKind::ResourceCreate, &legacy).unwrap().payload {
            EventPayload::Resource(payload) => {
                assert_eq!(payload.challenge_id, ChallengeRef::Legacy(30054522));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
