use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::conf::ProcessorConfig;
use crate::error::UpstreamError;

const TOTAL_HEADER: &str = "x-total";

/// Read-only client for the challenge, resource and submission APIs.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    auth_token: Option<String>,
    challenge_api_url: String,
    resources_api_url: String,
    submissions_api_url: String,
    page_size: u32,
}

impl UpstreamClient {
    pub fn new(config: &ProcessorConfig) -> Result<Self, UpstreamError> {
        Self::with_timeout(config, config.request_timeout())
    }

    pub fn with_timeout(
        config: &ProcessorConfig,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(concat!("chip-processor/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            auth_token: config.upstream_auth_token.clone(),
            challenge_api_url: trim_url(&config.challenge_api_url),
            resources_api_url: trim_url(&config.resources_api_url),
            submissions_api_url: trim_url(&config.submissions_api_url),
            page_size: config.page_size.max(1),
        })
    }

    fn request(&self, url: &str, query: &[(&str, String)]) -> RequestBuilder {
        let builder = self.client.get(url).query(query);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, UpstreamError> {
        debug!(url, ?query, "upstream GET");
        let response = self
            .request(url, query)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, e))?;
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(UpstreamError::NotFound(url.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(UpstreamError::Status {
                    url: url.to_string(),
                    status,
                    body,
                })
            }
        }
    }

    async fn decode<T: DeserializeOwned>(
        url: &str,
        response: Response,
    ) -> Result<T, UpstreamError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_reqwest(url, e))?;
        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let response = self.send(url, query).await?;
        Self::decode(url, response).await
    }

    /// Walks `page`/`perPage` until an empty or non-array page, or until the
    /// `X-Total` header says every record has been seen.
    pub async fn get_all_pages(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Value>, UpstreamError> {
        let per_page = self.page_size;
        let mut page: u32 = 1;
        let mut records = Vec::new();
        loop {
            let mut paged = vec![("page", page.to_string()), ("perPage", per_page.to_string())];
            paged.extend(query.iter().cloned());
            let response = self.send(url, &paged).await?;
            let total = response
                .headers()
                .get(TOTAL_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body: Value = Self::decode(url, response).await?;
            let items = match body {
                Value::Array(items) if !items.is_empty() => items,
                _ => break,
            };
            records.extend(items);
            if let Some(total) = total {
                if u64::from(page) * u64::from(per_page) >= total {
                    break;
                }
            }
            page += 1;
        }
        debug!(url, pages = page, records = records.len(), "collected all pages");
        Ok(records)
    }

    /// Canonical id of the challenge carrying `legacy_id`.
    pub async fn challenge_by_legacy_id(
        &self,
        legacy_id: i64,
    ) -> Result<String, UpstreamError> {
        let url = &self.challenge_api_url;
        let body: Value = self
            .get_json(url, &[("legacyId", legacy_id.to_string())])
            .await?;
        let record = match body {
            Value::Array(items) => items.into_iter().next(),
            Value::Object(map) => Some(Value::Object(map)),
            _ => None,
        }
        .ok_or_else(|| UpstreamError::NotFound(format!("legacyId={legacy_id}")))?;
        record
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| UpstreamError::Decode {
                url: url.clone(),
                reason: format!("challenge with legacyId {legacy_id} has no id"),
            })
    }

    /// Resource counts keyed by role id.
    pub async fn resource_counts(
        &self,
        challenge_id: &str,
        role_id: Option<&str>,
    ) -> Result<HashMap<String, i64>, UpstreamError> {
        let url = format!("{}/count", self.resources_api_url);
        let mut query = vec![("challengeId", challenge_id.to_string())];
        if let Some(role) = role_id {
            query.push(("roleId", role.to_string()));
        }
        self.get_json(&url, &query).await
    }

    pub async fn list_resources(
        &self,
        challenge_id: &str,
        role_id: Option<&str>,
    ) -> Result<Vec<Value>, UpstreamError> {
        let mut query = vec![("challengeId", challenge_id.to_string())];
        if let Some(role) = role_id {
            query.push(("roleId", role.to_string()));
        }
        self.get_all_pages(&self.resources_api_url, &query).await
    }

    /// Submission counts keyed by submission type label.
    pub async fn submission_counts(
        &self,
        challenge_id: &str,
    ) -> Result<HashMap<String, i64>, UpstreamError> {
        let url = format!("{}/count", self.submissions_api_url);
        self.get_json(&url, &[("challengeId", challenge_id.to_string())])
            .await
    }

    pub async fn list_submissions(
        &self,
        challenge_id: &str,
    ) -> Result<Vec<Value>, UpstreamError> {
        self.get_all_pages(
            &self.submissions_api_url,
            &[("challengeId", challenge_id.to_string())],
        )
        .await
    }

    pub async fn submission_by_id(&self, id: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/{id}", self.submissions_api_url);
        self.get_json(&url, &[]).await
    }
}

fn trim_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
