//! Remote table-per-entity backend.
//!
//! The backend speaks a PostgREST-style dialect: one resource per table under
//! `{base}/rest/v1/`, authenticated with an API key, with upserts resolved on
//! the `id` column.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::settings::Settings;

const USER_AGENT: &str = concat!("academy/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_all(&self, table: &str) -> Result<Vec<Value>, RemoteError>;

    /// Insert-or-replace every record, conflict-resolved on `id`.
    async fn upsert(&self, table: &str, records: &[Value]) -> Result<(), RemoteError>;
}

pub struct RestRemote {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestRemote {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// `None` when credentials are missing: the academy runs local-only.
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>, RemoteError> {
        match settings.remote_credentials() {
            Some((url, key)) => Self::new(url, key).map(Some),
            None => Ok(None),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(RemoteError::Api(status.as_u16(), error_text))
}

#[async_trait]
impl RemoteStore for RestRemote {
    async fn fetch_all(&self, table: &str) -> Result<Vec<Value>, RemoteError> {
        let url = self.table_url(table);
        tracing::debug!(table = %table, url = %url, "Fetching remote table");

        let response = self
            .authed(self.http_client.get(&url).query(&[("select", "*")]))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        check_status(response)
            .await?
            .json::<Vec<Value>>()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }

    async fn upsert(&self, table: &str, records: &[Value]) -> Result<(), RemoteError> {
        if records.is_empty() {
            return Ok(());
        }
        let url = self.table_url(table);
        tracing::debug!(table = %table, count = records.len(), "Upserting remote records");

        let response = self
            .authed(
                self.http_client
                    .post(&url)
                    .query(&[("on_conflict", "id")])
                    .header("Prefer", "resolution=merge-duplicates,return=minimal")
                    .json(records),
            )
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }
}
