use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{DataSource, SourceError};
use crate::config::ResourceRoutes;
use crate::models::Collection;

const BASE_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF_MS: u64 = 10_000;

/// FastAPI-style error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
struct BackendError {
    detail: Value,
}

/// `DataSource` over the backend REST API.
#[derive(Clone)]
pub struct HttpDataSource {
    client: Client,
    base_url: String,
    routes: ResourceRoutes,
    /// Attempts for idempotent requests: the first try plus `retries`.
    max_attempts: u32,
}

/// Delay before retry number `retry` (1-based): 200ms doubling, capped at 10s.
fn backoff_delay(retry: u32) -> Duration {
    let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

impl HttpDataSource {
    pub fn new(
        base_url: &str,
        routes: ResourceRoutes,
        retries: u32,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            routes,
            max_attempts: retries.saturating_add(1),
        })
    }

    fn collection_url(&self, collection: Collection) -> String {
        let route = &self.routes.get(collection).path;
        if route.starts_with('/') {
            format!("{}{}", self.base_url, route)
        } else {
            format!("{}/{}", self.base_url, route)
        }
    }

    fn item_url(&self, collection: Collection, id: &str) -> String {
        let base = self.collection_url(collection);
        let slash = if self.routes.get(collection).item_trailing_slash {
            "/"
        } else {
            ""
        };
        format!("{}/{}{}", base.trim_end_matches('/'), id, slash)
    }

    /// Sends the request built by `build` up to `attempts` times, retrying
    /// transport failures, 429 and 5xx with exponential backoff. Other
    /// statuses return immediately.
    async fn send_with_retry<F>(&self, attempts: u32, build: F) -> Result<Response, SourceError>
    where
        F: Fn() -> RequestBuilder,
    {
        let attempts = attempts.max(1);
        let mut last_error: Option<SourceError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    "Backend request attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match build().send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(SourceError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Backend returned {}: {}", status, body);
                last_error = Some(SourceError::Status {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<BackendError>(&body)
                    .map(|e| match e.detail {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .unwrap_or(body);
                return Err(SourceError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or(SourceError::Unavailable { attempts }))
    }

    async fn json_body(response: Response) -> Result<Value, SourceError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, SourceError> {
        let url = self.collection_url(collection);
        let response = self
            .send_with_retry(self.max_attempts, || self.client.get(&url))
            .await?;
        match Self::json_body(response).await? {
            Value::Array(items) => {
                debug!("Fetched {} {} from backend", items.len(), collection);
                Ok(items)
            }
            other => Err(SourceError::Decode(format!(
                "expected a JSON array for {collection}, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn create(&self, collection: Collection, payload: Value) -> Result<Value, SourceError> {
        // Not idempotent: a retry after a lost response could create a duplicate
        let url = self.collection_url(collection);
        let response = self
            .send_with_retry(1, || self.client.post(&url).json(&payload))
            .await?;
        Self::json_body(response).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        payload: Value,
    ) -> Result<Value, SourceError> {
        let url = self.item_url(collection, id);
        let response = self
            .send_with_retry(self.max_attempts, || self.client.put(&url).json(&payload))
            .await?;
        Self::json_body(response).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), SourceError> {
        let url = self.item_url(collection, id);
        self.send_with_retry(self.max_attempts, || self.client.delete(&url))
            .await?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
