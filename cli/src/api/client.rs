//! HTTP client for the YNAB-compatible REST API.

use std::time::Duration;

use async_trait::async_trait;
use mirror_engine::{Collection, Cursor, Delta};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{BudgetApi, BudgetSummary};
use crate::config::Config;
use crate::error::{Error, Result};

const MAX_LOG_BODY_CHARS: usize = 512;

/// Every successful response wraps its content in `data`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    detail: String,
}

#[derive(Debug, Deserialize)]
struct BudgetsData {
    budgets: Vec<BudgetSummary>,
}

#[derive(Debug, Deserialize)]
struct TransactionsData {
    transactions: Vec<serde_json::Value>,
}

/// Client for the remote budgeting API.
#[derive(Debug, Clone)]
pub struct YnabClient {
    client: reqwest::Client,
    base_url: String,
}

impl YnabClient {
    /// Create a client authenticated with a personal access token.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| Error::RemoteAuth("Invalid access token format".to_string()))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &Config, token: &str) -> Result<Self> {
        Self::new(&config.api_url, token, config.http_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!(%status, bytes = body.len(), "API response");
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!(%status, body = %preview, "API error response");
    }

    /// Parse a JSON response body, unwrapping the `data` envelope.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(ApiErrorResponse { error }) => describe(&error),
                Err(_) => format!("Request failed: {}", body),
            };
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(Error::RemoteAuth(message));
            }
            return Err(Error::remote(status.as_u16(), message));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        Ok(envelope.data)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.client.get(&url).query(query).send().await?;
        Self::parse_response(response).await
    }
}

fn describe(error: &ApiErrorDetail) -> String {
    match (error.name.is_empty(), error.detail.is_empty()) {
        (false, false) => format!("{}: {}", error.name, error.detail),
        (false, true) => error.name.clone(),
        (true, false) => error.detail.clone(),
        (true, true) => format!("error {}", error.id),
    }
}

/// Pull `data.<collection>` out of a collection response.
fn entities_of(
    data: &mut serde_json::Value,
    collection: Collection,
) -> Result<Vec<serde_json::Value>> {
    match data.get_mut(collection.as_str()).map(serde_json::Value::take) {
        Some(serde_json::Value::Array(entities)) => Ok(entities),
        _ => Err(mirror_engine::Error::InvalidPayload(format!(
            "response has no '{}' array",
            collection
        ))
        .into()),
    }
}

#[async_trait]
impl BudgetApi for YnabClient {
    async fn list_budgets(&self) -> Result<Vec<BudgetSummary>> {
        let data: BudgetsData = self.get("/budgets", &[]).await?;
        Ok(data.budgets)
    }

    async fn fetch_delta(
        &self,
        budget_id: &str,
        collection: Collection,
        cursor: Cursor,
    ) -> Result<Delta> {
        let mut query = vec![("last_knowledge_of_server", cursor.to_string())];
        if let Some(since) = collection.since_date() {
            query.push(("since_date", since.to_string()));
        }

        let path = format!("/budgets/{}/{}", budget_id, collection);
        let mut data: serde_json::Value = self.get(&path, &query).await?;

        let entities = entities_of(&mut data, collection)?;
        let server_knowledge = data
            .get("server_knowledge")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                mirror_engine::Error::InvalidPayload("response has no server_knowledge".into())
            })?;

        debug!(
            budget = budget_id,
            %collection,
            cursor,
            server_knowledge,
            changed = entities.len(),
            "Fetched delta"
        );
        Ok(Delta::new(entities, server_knowledge))
    }

    async fn list(
        &self,
        budget_id: &str,
        collection: Collection,
    ) -> Result<Vec<serde_json::Value>> {
        let query: Vec<(&str, String)> = collection
            .since_date()
            .map(|since| vec![("since_date", since.to_string())])
            .unwrap_or_default();

        let path = format!("/budgets/{}/{}", budget_id, collection);
        let mut data: serde_json::Value = self.get(&path, &query).await?;
        entities_of(&mut data, collection)
    }

    async fn list_account_transactions(
        &self,
        budget_id: &str,
        account_id: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let path = format!("/budgets/{}/accounts/{}/transactions", budget_id, account_id);
        let data: TransactionsData = self.get(&path, &[]).await?;
        Ok(data.transactions)
    }

    async fn update_transactions(
        &self,
        budget_id: &str,
        transactions: Vec<serde_json::Value>,
    ) -> Result<Vec<serde_json::Value>> {
        let url = self.url(&format!("/budgets/{}/transactions", budget_id));
        debug!(%url, count = transactions.len(), "PATCH");

        let response = self
            .client
            .patch(&url)
            .json(&json!({ "transactions": transactions }))
            .send()
            .await?;
        let data: TransactionsData = Self::parse_response(response).await?;
        Ok(data.transactions)
    }
}
