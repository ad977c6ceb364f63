use serde_json::Value;

use crate::traits::{Document, PartialUpdate};

/// Applies a partial document the way the search index does for `doc` updates.
pub fn merge_partial(target: &mut Document, partial: Document) {
    for (key, value) in partial {
        match value {
            Value::Object(incoming) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => merge_partial(existing, incoming),
                _ => {
                    target.insert(key, Value::Object(incoming));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// Applies both halves of `update`: merged keys first, then replaced keys.
pub fn apply_update(target: &mut Document, update: PartialUpdate) {
    merge_partial(target, update.merge);
    target.extend(update.replace);
}
