use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::models::errors::SubgraphError;

/// One previously indexed record as returned by the query service. The
/// subgraph serializes its big integers as decimal strings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredInfo {
    pub id: String,
    pub sender: String,
    pub name: String,
    pub data: String,
    pub timestamp: String,
    pub block_number: String,
}

impl StoredInfo {
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp.parse().ok()?, 0)
    }
}

/// Read-side client for the indexing query service. The endpoint is passed in
/// explicitly at construction rather than read from ambient environment.
pub struct SubgraphClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl SubgraphClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Fetch the most recently stored records, newest first.
    pub async fn latest_infos(&self, first: usize) -> Result<Vec<StoredInfo>> {
        let query = build_query(first);
        debug!("Querying subgraph at {}", self.endpoint);

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "query": query }))
            .send()
            .await
            .context("failed to send subgraph query")?;

        let body: Value = response
            .json()
            .await
            .context("failed to read subgraph response body")?;

        parse_response(&body)
    }
}

pub fn build_query(first: usize) -> String {
    format!(
        "{{ infoStoreds(first: {first}, orderBy: timestamp, orderDirection: desc) \
         {{ id sender name data timestamp blockNumber }} }}"
    )
}

pub fn parse_response(body: &Value) -> Result<Vec<StoredInfo>> {
    // A GraphQL error payload still arrives with HTTP 200
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let message = errors
            .first()
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(SubgraphError::QueryFailed { message }.into());
    }

    let records = body
        .get("data")
        .and_then(|d| d.get("infoStoreds"))
        .ok_or(SubgraphError::MissingField {
            field: "data.infoStoreds",
        })?;

    serde_json::from_value(records.clone()).context("failed to deserialize subgraph records")
}
