use std::borrow::Cow;

use serde_json::{Map, Value};
use uuid::Uuid;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::event::EventKind;
use crate::time::Timestamp;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("\"{0}\" must be an object")]
    NotAnObject(String),

    #[error("\"{0}\" is required")]
    Required(String),

    #[error("\"{0}\" must be a string")]
    NotAString(String),

    #[error("\"{0}\" is not allowed to be empty")]
    Empty(String),

    #[error("\"{0}\" must be a number of milliseconds or valid date string")]
    InvalidDate(String),

    #[error("invalid {kind} payload: {reason}")]
    Payload { kind: EventKind, reason: String },

    #[error("{}", .0.join("; "))]
    Constraint(Vec<String>),

    #[error("\"challengeId\" must be a valid GUID or a legacy numeric id, got {0}")]
    ChallengeRef(String),

    #[error("phase {0} is part of a predecessor cycle")]
    PhaseCycle(String),

    #[error("\"duration\" total of {0} seconds puts the end date out of range")]
    DurationOutOfRange(f64),
}

impl From<ValidationErrors> for ValidationError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages = Vec::new();
        flatten(&errors, "", &mut messages);
        messages.sort();
        ValidationError::Constraint(messages)
    }
}

/// Renders nested validator output as `path: "leaf" message` lines.
fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = format!("{prefix}{field}");
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .clone()
                        .unwrap_or_else(|| Cow::Owned(format!("failed {}", err.code)));
                    out.push(format!("{path}: \"{field}\" {message}"));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                flatten(inner, &format!("{path}."), out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(inner, &format!("{path}[{index}]."), out);
                }
            }
        }
    }
}

pub fn validate_uuid(value: &str) -> Result<(), validator::ValidationError> {
    Uuid::parse_str(value).map(|_| ()).map_err(|_| {
        validator::ValidationError::new("uuid")
            .with_message(Cow::Borrowed("must be a valid GUID"))
    })
}

pub(crate) fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        Err(validator::ValidationError::new("empty")
            .with_message(Cow::Borrowed("is not allowed to be empty")))
    } else {
        Ok(())
    }
}

pub(crate) fn is_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

pub(crate) fn require_str<'a>(
    object: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a str, ValidationError> {
    match object.get(field) {
        None => Err(ValidationError::Required(field.to_string())),
        Some(Value::String(s)) if s.is_empty() => {
            Err(ValidationError::Empty(field.to_string()))
        }
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::NotAString(field.to_string())),
    }
}

pub(crate) fn require_date(
    object: &Map<String, Value>,
    field: &str,
) -> Result<Timestamp, ValidationError> {
    let value = object
        .get(field)
        .ok_or_else(|| ValidationError::Required(field.to_string()))?;
    Timestamp::from_value(value)
        .ok_or_else(|| ValidationError::InvalidDate(field.to_string()))
}

pub(crate) fn require_object<'a>(
    object: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a Map<String, Value>, ValidationError> {
    match object.get(field) {
        None => Err(ValidationError::Required(field.to_string())),
        Some(Value::Object(inner)) => Ok(inner),
        Some(_) => Err(ValidationError::NotAnObject(field.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use validator::Validate;

    #[derive(Validate)]
    struct Leaf {
        #[validate(range(exclusive_min = 0.0, message = "must be a positive number"))]
        duration: f64,
    }

    #[derive(Validate)]
    struct Root {
        #[validate(nested)]
        phases: Vec<Leaf>,
        #[validate(custom(function = "validate_uuid"))]
        id: String,
    }

    #[test]
    fn flattened_messages_name_field_and_constraint() {
        let root = Root {
            phases: vec![Leaf { duration: 1.0 }, Leaf { duration: 0.0 }],
            id: "abc".into(),
        };
        let err: ValidationError = root.validate().unwrap_err().into();
        let text = err.to_string();
        assert!(text.contains("phases[1].duration: \"duration\" must be a positive number"));
        assert!(text.contains("id: \"id\" must be a valid GUID"));
    }

    #[test]
    fn envelope_field_helpers() {
        let obj = json!({"a": "", "b": 1, "c": "x", "d": "abc"});
        let obj = obj.as_object().unwrap();
        assert_eq!(
            require_str(obj, "a").unwrap_err().to_string(),
            "\"a\" is not allowed to be empty"
        );
        assert_eq!(
            require_str(obj, "b").unwrap_err().to_string(),
            "\"b\" must be a string"
        );
        assert_eq!(require_str(obj, "c").unwrap(), "x");
        assert_eq!(
            require_str(obj, "z").unwrap_err().to_string(),
            "\"z\" is required"
        );
        assert_eq!(
            require_date(obj, "d").unwrap_err().to_string(),
            "\"d\" must be a number of milliseconds or valid date string"
        );
    }
}
