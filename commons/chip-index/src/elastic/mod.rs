use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::IndexError;
use crate::traits::*;

/// Every write asks for `refresh=true` so later events read their own writes.
const REFRESH: (&str, &str) = ("refresh", "true");

/// Recursive `doc` merge followed by wholesale replacement of the `replace` keys.
const MERGE_AND_REPLACE: &str = "\
void merge(Map target, Map incoming) { \
  for (def entry : incoming.entrySet()) { \
    def current = target.get(entry.getKey()); \
    if (current instanceof Map && entry.getValue() instanceof Map) { \
      merge(current, entry.getValue()); \
    } else { \
      target.put(entry.getKey(), entry.getValue()); \
    } \
  } \
} \
merge(ctx._source, params.merge); \
ctx._source.putAll(params.replace);";

/// Elasticsearch/OpenSearch REST backend.
pub struct ElasticChallengeIndex {
    client: Client,
    base_url: String,
    index: String,
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(default)]
    found: bool,
    #[serde(rename = "_seq_no")]
    seq_no: Option<u64>,
    #[serde(rename = "_primary_term")]
    primary_term: Option<u64>,
    #[serde(rename = "_source")]
    source: Option<Document>,
}

#[derive(Deserialize)]
struct WriteResponse {
    #[serde(rename = "_seq_no")]
    seq_no: u64,
    #[serde(rename = "_primary_term")]
    primary_term: u64,
}

impl From<WriteResponse> for DocVersion {
    fn from(value: WriteResponse) -> Self {
        DocVersion {
            seq_no: value.seq_no,
            primary_term: value.primary_term,
        }
    }
}

#[derive(Deserialize)]
struct ClusterHealth {
    status: String,
}

impl ElasticChallengeIndex {
    pub fn new(
        base_url: impl Into<String>,
        index: impl Into<String>,
        timeout: Duration,
    ) -> IndexResult<Self> {
        let mut base_url: String = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            base_url = format!("http://{base_url}");
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::Backend(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.index, path)
    }

    async fn write_version(response: Response) -> IndexResult<DocVersion> {
        let body: WriteResponse = response.json().await.map_err(map_reqwest)?;
        Ok(body.into())
    }
}

fn map_reqwest(err: reqwest::Error) -> IndexError {
    if err.is_timeout() {
        IndexError::Timeout(err.to_string())
    } else if err.is_connect() {
        IndexError::Connection(err.to_string())
    } else if err.is_decode() {
        IndexError::Backend(format!("malformed response: {err}"))
    } else {
        IndexError::Backend(err.to_string())
    }
}

/// A plain partial `doc` when nothing needs replacing, a script otherwise.
fn update_body(update: PartialUpdate) -> Value {
    if update.replace.is_empty() {
        return json!({ "doc": Value::Object(update.merge) });
    }
    json!({
        "script": {
            "lang": "painless",
            "source": MERGE_AND_REPLACE,
            "params": {
                "merge": Value::Object(update.merge),
                "replace": Value::Object(update.replace),
            }
        }
    })
}

async fn unexpected(response: Response) -> IndexError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!(%status, body = %body, "unexpected index response");
    IndexError::Backend(format!("status {status}: {body}"))
}

#[async_trait]
impl ChallengeIndex for ElasticChallengeIndex {
    async fn get(&self, id: &str) -> IndexResult<Option<VersionedDocument>> {
        let response = self
            .client
            .get(self.url(&format!("_doc/{id}")))
            .send()
            .await
            .map_err(map_reqwest)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: GetResponse = response.json().await.map_err(map_reqwest)?;
                if !body.found {
                    return Ok(None);
                }
                match (body.seq_no, body.primary_term) {
                    (Some(seq_no), Some(primary_term)) => Ok(Some(VersionedDocument {
                        id: id.to_string(),
                        version: DocVersion {
                            seq_no,
                            primary_term,
                        },
                        source: body.source.unwrap_or_default(),
                    })),
                    _ => Err(IndexError::Backend(format!(
                        "document {id} returned without a version"
                    ))),
                }
            }
            _ => Err(unexpected(response).await),
        }
    }

    async fn create(&self, id: &str, document: Document) -> IndexResult<DocVersion> {
        let response = self
            .client
            .put(self.url(&format!("_create/{id}")))
            .query(&[REFRESH])
            .json(&document)
            .send()
            .await
            .map_err(map_reqwest)?;
        match response.status() {
            StatusCode::CONFLICT => Err(IndexError::Conflict(id.to_string())),
            status if status.is_success() => {
                debug!(id, "created document");
                Self::write_version(response).await
            }
            _ => Err(unexpected(response).await),
        }
    }

    async fn update(
        &self,
        id: &str,
        update: PartialUpdate,
        if_version: Option<DocVersion>,
    ) -> IndexResult<DocVersion> {
        let mut query = vec![(REFRESH.0, REFRESH.1.to_string())];
        if let Some(version) = if_version {
            query.push(("if_seq_no", version.seq_no.to_string()));
            query.push(("if_primary_term", version.primary_term.to_string()));
        }
        let response = self
            .client
            .post(self.url(&format!("_update/{id}")))
            .query(&query)
            .json(&update_body(update))
            .send()
            .await
            .map_err(map_reqwest)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(IndexError::NotFound(id.to_string())),
            StatusCode::CONFLICT => Err(IndexError::VersionConflict {
                id: id.to_string(),
                expected: if_version
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "latest".to_string()),
            }),
            status if status.is_success() => {
                debug!(id, "updated document");
                Self::write_version(response).await
            }
            _ => Err(unexpected(response).await),
        }
    }

    async fn delete(&self, id: &str) -> IndexResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("_doc/{id}")))
            .query(&[REFRESH])
            .send()
            .await
            .map_err(map_reqwest)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(IndexError::NotFound(id.to_string())),
            status if status.is_success() => Ok(()),
            _ => Err(unexpected(response).await),
        }
    }

    async fn health(&self) -> IndexResult<()> {
        let response = self
            .client
            .get(format!("{}/_cluster/health", self.base_url))
            .send()
            .await
            .map_err(map_reqwest)?;
        if !response.status().is_success() {
            return Err(unexpected(response).await);
        }
        let health: ClusterHealth = response.json().await.map_err(map_reqwest)?;
        if health.status == "red" {
            return Err(IndexError::Backend("cluster health is red".to_string()));
        }
        Ok(())
    }
}
