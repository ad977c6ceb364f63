use std::collections::HashMap;

use chip_models::EventKind;
use tracing::warn;

/// Static routing table from delivery topic to event kind.
#[derive(Debug, Clone, Default)]
pub struct TopicMap {
    kinds: HashMap<String, EventKind>,
}

impl TopicMap {
    pub fn new(entries: impl IntoIterator<Item = (String, EventKind)>) -> Self {
        let mut kinds = HashMap::new();
        for (topic, kind) in entries {
            if let Some(previous) = kinds.insert(topic.clone(), kind) {
                warn!(%topic, %previous, %kind, "topic configured twice, last kind wins");
            }
        }
        Self { kinds }
    }

    pub fn kind_of(&self, topic: &str) -> Option<EventKind> {
        self.kinds.get(topic).copied()
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_topics_to_kinds() {
        let map = TopicMap::new([
            ("challenge.notification.update".to_string(), EventKind::ChallengeUpdate),
            ("submission.notification.delete".to_string(), EventKind::SubmissionDelete),
        ]);
        assert_eq!(map.topics().count(), 2);
        assert_eq!(
            map.kind_of("submission.notification.delete"),
            Some(EventKind::SubmissionDelete)
        );
        assert_eq!(map.kind_of("challenge.notification.delete"), None);
    }

    #[test]
    fn duplicate_topic_keeps_last_kind() {
        let map = TopicMap::new([
            ("shared".to_string(), EventKind::ResourceCreate),
            ("shared".to_string(), EventKind::ResourceUpdate),
        ]);
        assert_eq!(map.topics().count(), 1);
        assert_eq!(map.kind_of("shared"), Some(EventKind::ResourceUpdate));
    }
}
