use std::env;

use chip_models::EventKind;
use chip_processor::ProcessorConfig;
use chip_processor::conf::{AggregationMode, IndexBackend, LogFormat};
use envconfig::Envconfig;
use serial_test::serial;

const VARS: [&str; 6] = [
    "UPDATE_DATA_TOPIC",
    "REGISTRANT_RESOURCE_ROLE_ID",
    "AGGREGATION_MODE",
    "INDEX_BACKEND",
    "REQUEST_TIMEOUT",
    "LOG_FORMAT",
];

fn clear() {
    for var in VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

#[test]
#[serial]
fn defaults_match_deployment() {
    clear();
    let config = ProcessorConfig::init_from_env().unwrap();
    assert_eq!(config.update_data_topic, "challenge.notification.update");
    assert_eq!(config.delete_submission_topic, "submission.notification.delete");
    assert_eq!(config.challenge_api_url, "http://localhost:4000/v5/challenges");
    assert_eq!(config.contest_submission_type, "Contest Submission");
    assert_eq!(config.challenge_submission_type, "challengesubmission");
    assert_eq!(config.aggregation_mode, AggregationMode::Count);
    assert_eq!(config.index_backend, IndexBackend::Memory);
    assert_eq!(config.log_format, LogFormat::Plain);
    assert_eq!(config.request_timeout().as_millis(), 20_000);
    assert_eq!(config.page_size, 20);
    assert_eq!(config.es_index, "challenge");
    assert!(config.registrant_role().is_none());

    let topics = config.topic_map();
    assert_eq!(topics.topics().count(), 8);
    assert_eq!(
        topics.kind_of("challenge.action.resource.delete"),
        Some(EventKind::ResourceDelete)
    );
}

#[test]
#[serial]
fn overrides_are_read_from_env() {
    clear();
    unsafe {
        env::set_var("UPDATE_DATA_TOPIC", "custom.update");
        env::set_var("REGISTRANT_RESOURCE_ROLE_ID", " 732339e7-8e30-49d7-9198-cccf9451e221 ");
        env::set_var("AGGREGATION_MODE", "Paged");
        env::set_var("INDEX_BACKEND", "elasticsearch");
        env::set_var("REQUEST_TIMEOUT", "1500");
        env::set_var("LOG_FORMAT", "json");
    }
    let config = ProcessorConfig::init_from_env().unwrap();
    clear();

    assert_eq!(config.aggregation_mode, AggregationMode::Paged);
    assert_eq!(config.index_backend, IndexBackend::Elastic);
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.request_timeout().as_millis(), 1_500);
    assert_eq!(
        config.registrant_role(),
        Some("732339e7-8e30-49d7-9198-cccf9451e221")
    );
    assert_eq!(
        config.topic_map().kind_of("custom.update"),
        Some(EventKind::ChallengeUpdate)
    );
    assert_eq!(config.topic_map().kind_of("challenge.notification.update"), None);
}

#[test]
#[serial]
fn unknown_mode_is_rejected() {
    clear();
    unsafe {
        env::set_var("AGGREGATION_MODE", "sometimes");
    }
    let result = ProcessorConfig::init_from_env();
    clear();
    assert!(result.is_err());
}
