//! HTTP client for the portfolio backend REST API.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use super::{ExchangeApi, TaskBackend};
use crate::{
    error::{AppError, Result},
    types::{
        AsyncTaskResponse, ExchangeAccount, ExchangeSetupPayload, Location,
        SavingsCollectionResponse, SavingsFilter, TaskId, TaskStatus,
    },
};

/// API version prefix.
const API_PREFIX: &str = "api/1";

/// Response envelope used by every endpoint.
#[derive(Debug, Deserialize)]
struct ActionResult<T> {
    result: Option<T>,
    #[serde(default)]
    message: String,
}

/// Identifies an account in removal requests.
#[derive(Debug, Serialize)]
struct AccountKey<'a> {
    name: &'a str,
    location: Location,
}

/// Savings filter plus the query mode flag.
#[derive(Debug, Serialize)]
struct SavingsRequest<'a> {
    #[serde(flatten)]
    filter: &'a SavingsFilter,
    async_query: bool,
}

/// Backend REST client.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// Note: This does NOT make any network calls.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!("Invalid backend URL: {}", base_url)));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(backend_url = %base_url, "Backend client created");

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Absolute URL of an API path.
    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Send a request and unwrap the response envelope.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope: ActionResult<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(AppError::Parse(format!("Malformed backend response: {}", e)))
            }
            Err(_) => return Err(AppError::Api(format!("Backend returned status {}", status))),
        };

        unwrap_envelope(envelope, status.is_success())
    }
}

fn unwrap_envelope<T>(envelope: ActionResult<T>, success: bool) -> Result<T> {
    match envelope.result {
        Some(result) if success => Ok(result),
        _ if envelope.message.is_empty() => {
            Err(AppError::Api("Backend returned no result".to_string()))
        }
        _ => Err(AppError::Api(envelope.message)),
    }
}

#[async_trait]
impl ExchangeApi for BackendClient {
    async fn list_exchanges(&self) -> Result<Vec<ExchangeAccount>> {
        self.send(self.request(Method::GET, "exchanges")).await
    }

    async fn query_exchange_balances(
        &self,
        location: Location,
        ignore_cache: bool,
    ) -> Result<TaskId> {
        tracing::debug!(location = %location, ignore_cache, "Requesting exchange balances");

        let request = self
            .request(Method::GET, &format!("exchanges/balances/{}", location))
            .query(&[("async_query", "true"), ("ignore_cache", bool_str(ignore_cache))]);

        let response: AsyncTaskResponse = self.send(request).await?;
        Ok(response.task_id)
    }

    async fn remove_exchange(&self, account: &ExchangeAccount) -> Result<bool> {
        let body = AccountKey { name: &account.name, location: account.location };
        self.send(self.request(Method::DELETE, "exchanges").json(&body)).await
    }

    async fn setup_exchange(&self, payload: &ExchangeSetupPayload, edit: bool) -> Result<bool> {
        let method = if edit { Method::PATCH } else { Method::PUT };
        self.send(self.request(method, "exchanges").json(payload)).await
    }

    async fn query_savings_cache(
        &self,
        filter: &SavingsFilter,
    ) -> Result<SavingsCollectionResponse> {
        let body = SavingsRequest { filter, async_query: false };
        let path = format!("exchanges/{}/savings", filter.location);
        self.send(self.request(Method::POST, &path).json(&body)).await
    }

    async fn start_savings_refresh(&self, filter: &SavingsFilter) -> Result<TaskId> {
        let body = SavingsRequest { filter, async_query: true };
        let path = format!("exchanges/{}/savings", filter.location);
        let response: AsyncTaskResponse =
            self.send(self.request(Method::POST, &path).json(&body)).await?;
        Ok(response.task_id)
    }
}

#[async_trait]
impl TaskBackend for BackendClient {
    async fn query_task(&self, task_id: TaskId) -> Result<TaskStatus> {
        self.send(self.request(Method::GET, &format!("tasks/{}", task_id))).await
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
