// HTTP Queue API adapter
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use waitline_core::domain::{QueueEntry, QueueSnapshot};
use waitline_core::port::{ApiError, QueueApi};

pub const QUEUE_PATH: &str = "/api/queue";
pub const DONE_TODAY_PATH: &str = "/api/stats/done-today";

/// Default per-request timeout (5s)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct DoneTodayResponse {
    count: u64,
}

pub struct HttpQueueApi {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpQueueApi {
    /// # Errors
    /// - ApiError::Transport if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.request_timeout.as_millis() as u64)
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl QueueApi for HttpQueueApi {
    async fn fetch_queue(&self) -> Result<QueueSnapshot, ApiError> {
        let entries: Vec<QueueEntry> = self.get_json(QUEUE_PATH).await?;
        Ok(QueueSnapshot::from(entries))
    }

    async fn served_today(&self) -> Result<u64, ApiError> {
        let response: DoneTodayResponse = self.get_json(DONE_TODAY_PATH).await?;
        Ok(response.count)
    }
}
