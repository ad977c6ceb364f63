use std::str::FromStr;
use std::time::Duration;

use chip_models::EventKind;
use envconfig::Envconfig;

use crate::topic::TopicMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationMode {
    /// Ask the upstream `/count` endpoints for a per-key count map.
    #[default]
    Count,
    /// List every record page by page and count locally.
    Paged,
}

impl FromStr for AggregationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(AggregationMode::Count),
            "paged" | "list" => Ok(AggregationMode::Paged),
            other => Err(format!("unknown aggregation mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexBackend {
    #[default]
    Memory,
    Elastic,
}

impl FromStr for IndexBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(IndexBackend::Memory),
            "elastic" | "elasticsearch" | "es" => Ok(IndexBackend::Elastic),
            other => Err(format!("unknown index backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Envconfig)]
pub struct ProcessorConfig {
    // Topics
    #[envconfig(from = "UPDATE_DATA_TOPIC", default = "challenge.notification.update")]
    pub update_data_topic: String,

    #[envconfig(from = "CREATE_DATA_TOPIC", default = "challenge.notification.create")]
    pub create_data_topic: String,

    #[envconfig(
        from = "CREATE_RESOURCE_TOPIC",
        default = "challenge.action.resource.create"
    )]
    pub create_resource_topic: String,

    #[envconfig(
        from = "UPDATE_RESOURCE_TOPIC",
        default = "challenge.action.resource.update"
    )]
    pub update_resource_topic: String,

    #[envconfig(
        from = "DELETE_RESOURCE_TOPIC",
        default = "challenge.action.resource.delete"
    )]
    pub delete_resource_topic: String,

    #[envconfig(
        from = "CREATE_SUBMISSION_TOPIC",
        default = "submission.notification.create"
    )]
    pub create_submission_topic: String,

    #[envconfig(
        from = "UPDATE_SUBMISSION_TOPIC",
        default = "submission.notification.update"
    )]
    pub update_submission_topic: String,

    #[envconfig(
        from = "DELETE_SUBMISSION_TOPIC",
        default = "submission.notification.delete"
    )]
    pub delete_submission_topic: String,

    // Registrant filter; every role counts when unset
    #[envconfig(from = "REGISTRANT_RESOURCE_ROLE_ID")]
    pub registrant_role_id: Option<String>,

    // Upstream APIs
    #[envconfig(
        from = "CHALLENGE_API_URL",
        default = "http://localhost:4000/v5/challenges"
    )]
    pub challenge_api_url: String,

    #[envconfig(
        from = "RESOURCES_API_URL",
        default = "http://localhost:4000/v5/resources"
    )]
    pub resources_api_url: String,

    #[envconfig(
        from = "SUBMISSIONS_API_URL",
        default = "http://localhost:4000/v5/submissions"
    )]
    pub submissions_api_url: String,

    #[envconfig(from = "UPSTREAM_AUTH_TOKEN")]
    pub upstream_auth_token: Option<String>,

    #[envconfig(from = "REQUEST_TIMEOUT", default = "20000")]
    pub request_timeout_ms: u64,

    #[envconfig(from = "AGGREGATION_MODE", default = "count")]
    pub aggregation_mode: AggregationMode,

    #[envconfig(from = "PAGE_SIZE", default = "20")]
    pub page_size: u32,

    // Submission type labels
    #[envconfig(from = "CONTEST_SUBMISSION_TYPE", default = "Contest Submission")]
    pub contest_submission_type: String,

    #[envconfig(from = "CHALLENGE_SUBMISSION_TYPE", default = "challengesubmission")]
    pub challenge_submission_type: String,

    #[envconfig(
        from = "CHECKPOINT_SUBMISSION_TYPE",
        default = "Checkpoint Submission"
    )]
    pub checkpoint_submission_type: String,

    // Index
    #[envconfig(from = "INDEX_BACKEND", default = "memory")]
    pub index_backend: IndexBackend,

    #[envconfig(from = "ES_HOST", default = "localhost:9200")]
    pub es_host: String,

    #[envconfig(from = "ES_INDEX", default = "challenge")]
    pub es_index: String,

    // Server and logging
    #[envconfig(from = "HTTP_PORT", default = "8080")]
    pub http_port: u16,

    #[envconfig(from = "LOG_FORMAT", default = "plain")]
    pub log_format: LogFormat,
}

impl ProcessorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The registrant role filter, treating a blank value as unset.
    pub fn registrant_role(&self) -> Option<&str> {
        self.registrant_role_id
            .as_deref()
            .map(str::trim)
            .filter(|role| !role.is_empty())
    }

    pub fn topic_map(&self) -> TopicMap {
        TopicMap::new([
            (self.create_data_topic.clone(), EventKind::ChallengeCreate),
            (self.update_data_topic.clone(), EventKind::ChallengeUpdate),
            (self.create_resource_topic.clone(), EventKind::ResourceCreate),
            (self.update_resource_topic.clone(), EventKind::ResourceUpdate),
            (self.delete_resource_topic.clone(), EventKind::ResourceDelete),
            (self.create_submission_topic.clone(), EventKind::SubmissionCreate),
            (self.update_submission_topic.clone(), EventKind::SubmissionUpdate),
            (self.delete_submission_topic.clone(), EventKind::SubmissionDelete),
        ])
    }
}
