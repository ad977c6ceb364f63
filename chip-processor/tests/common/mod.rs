#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use chip_index::memory::MemoryChallengeIndex;
use chip_index::{ChallengeIndex, Document};
use chip_processor::{Dispatcher, ProcessorConfig, build_dispatcher_with_index};
use envconfig::Envconfig;
use serde_json::{Value, json};
use wiremock::MockServer;

pub const CHALLENGE: &str = "7b37a31e-484c-4d1e-aa9f-cfd6656e11d8";
pub const LEGACY_ID: i64 = 30054522;
pub const REGISTRANT_ROLE: &str = "732339e7-8e30-49d7-9198-cccf9451e221";
pub const OTHER_ROLE: &str = "173803d3-019e-4033-b1cf-d7205c7f773a";
pub const SUBMISSION: &str = "171233d3-019e-4033-b1cf-d7205c7f773a";
pub const PHASE_A: &str = "aa2c1d2e-1234-4d1e-aa9f-cfd6656e11d8";
pub const PHASE_B: &str = "bb2c1d2e-1234-4d1e-aa9f-cfd6656e11d8";

pub const UPDATE_TOPIC: &str = "challenge.notification.update";
pub const CREATE_TOPIC: &str = "challenge.notification.create";
pub const RESOURCE_CREATE_TOPIC: &str = "challenge.action.resource.create";
pub const RESOURCE_DELETE_TOPIC: &str = "challenge.action.resource.delete";
pub const SUBMISSION_CREATE_TOPIC: &str = "submission.notification.create";
pub const SUBMISSION_DELETE_TOPIC: &str = "submission.notification.delete";

/// Config pointing every upstream API at `server`.
pub fn config_for(server: &MockServer, overrides: &[(&str, &str)]) -> ProcessorConfig {
    let uri = server.uri();
    let mut vars: HashMap<String, String> = HashMap::from([
        ("CHALLENGE_API_URL".into(), format!("{uri}/v5/challenges")),
        ("RESOURCES_API_URL".into(), format!("{uri}/v5/resources")),
        ("SUBMISSIONS_API_URL".into(), format!("{uri}/v5/submissions")),
        ("REGISTRANT_RESOURCE_ROLE_ID".into(), REGISTRANT_ROLE.into()),
        ("REQUEST_TIMEOUT".into(), "2000".into()),
    ]);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    ProcessorConfig::init_from_hashmap(&vars).expect("test config")
}

pub struct Fixture {
    pub dispatcher: Dispatcher,
    pub index: MemoryChallengeIndex,
}

impl Fixture {
    pub fn new(config: &ProcessorConfig) -> Self {
        let index = MemoryChallengeIndex::new();
        Self::with_index(config, index.clone(), Arc::new(index))
    }

    pub fn with_index(
        config: &ProcessorConfig,
        index: MemoryChallengeIndex,
        backend: Arc<dyn ChallengeIndex>,
    ) -> Self {
        let dispatcher = build_dispatcher_with_index(config, backend).expect("dispatcher");
        Self { dispatcher, index }
    }

    pub async fn seed(&self, document: Value) {
        let doc: Document = document.as_object().cloned().expect("object");
        let id = doc["id"].as_str().expect("id").to_string();
        self.index
            .create(&id, doc)
            .await
            .expect("seed document");
    }

    pub async fn stored(&self, id: &str) -> Document {
        self.index
            .get(id)
            .await
            .expect("index read")
            .expect("document exists")
            .source
    }
}

pub fn message(topic: &str, originator: &str, payload: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "topic": topic,
        "originator": originator,
        "timestamp": "2019-02-04T01:01:00",
        "mime-type": "application/json",
        "payload": payload,
    }))
    .expect("encode message")
}

pub fn seeded_challenge() -> Value {
    json!({
        "id": CHALLENGE,
        "name": "original",
        "startDate": "2019-02-04T01:01:00.000Z",
        "numOfRegistrants": 0,
        "numOfSubmissions": 0,
    })
}

pub fn resource_payload(role_id: &str) -> Value {
    json!({
        "id": "271233d3-019e-4033-b1cf-d7205c7f7731",
        "challengeId": CHALLENGE,
        "memberId": 123,
        "roleId": role_id,
    })
}
