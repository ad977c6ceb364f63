use chip_models::{ChallengeEvent, EventPayload};
use serde_json::Value;
use tracing::{Span, debug, instrument};

use crate::error::ProcessorError;
use crate::handlers::{self, HandlerContext, Outcome};
use crate::topic::TopicMap;

/// Routes one delivered message to the handler for its topic.
///
/// Messages are independent: a failure is reported for that message only and
/// leaves the dispatcher usable for the next one.
#[derive(Clone)]
pub struct Dispatcher {
    topics: TopicMap,
    ctx: HandlerContext,
}

impl Dispatcher {
    pub fn new(topics: TopicMap, ctx: HandlerContext) -> Self {
        Self { topics, ctx }
    }

    pub fn topics(&self) -> &TopicMap {
        &self.topics
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    /// Handles a raw message body delivered on `topic`.
    #[instrument(skip(self, body), fields(kind = tracing::field::Empty))]
    pub async fn handle(&self, topic: &str, body: &[u8]) -> Result<Outcome, ProcessorError> {
        let kind = self
            .topics
            .kind_of(topic)
            .ok_or_else(|| ProcessorError::UnknownTopic(topic.to_string()))?;
        Span::current().record("kind", kind.as_str());

        let message: Value =
            serde_json::from_slice(body).map_err(ProcessorError::InvalidJson)?;
        let event = ChallengeEvent::decode(kind, &message)?;
        if event.envelope.topic != topic {
            return Err(ProcessorError::TopicMismatch {
                expected: topic.to_string(),
                actual: event.envelope.topic,
            });
        }
        debug!(originator = %event.envelope.originator, "message validated");
        self.route(event).await
    }

    async fn route(&self, event: ChallengeEvent) -> Result<Outcome, ProcessorError> {
        let ChallengeEvent {
            kind,
            payload,
            raw_payload,
            ..
        } = event;
        match payload {
            EventPayload::ChallengeCreate(create) => {
                handlers::challenge::create(&self.ctx, &create, raw_payload).await
            }
            EventPayload::ChallengeUpdate(update) => {
                handlers::challenge::update(&self.ctx, &update, raw_payload).await
            }
            EventPayload::Resource(resource) => {
                handlers::resource::handle(&self.ctx, kind, &resource).await
            }
            EventPayload::Submission(submission) => {
                handlers::submission::handle(&self.ctx, kind, &submission).await
            }
        }
    }
}
