//! REST client for the video-generation provider.
//!
//! Distinguishes two failure kinds: [`ProviderError::Rejected`] when the
//! provider declined the request (4xx), and [`ProviderError::Unavailable`]
//! for transport failures and 5xx responses. The lifecycle tracker treats
//! both as a terminal submission failure but preserves the distinction in
//! the stored error message.

use crate::types::{StatusPayload, SubmitRequest, SubmitResponse, TaskState};

/// HTTP client for the provider API.
///
/// Cheap to clone; the inner [`reqwest::Client`] pools connections.
#[derive(Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the provider gateway.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider could not be reached or answered with a 5xx.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The provider declined the request as invalid (4xx).
    #[error("Provider rejected the request ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ProviderClient {
    /// Create a new client.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `https://api.provider.example`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Base HTTP URL of the provider.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a generation task.
    ///
    /// Sends `POST /tasks` authenticated with the pooled credential.
    /// Returns the provider-assigned task identifier.
    pub async fn submit(
        &self,
        request: &SubmitRequest,
        api_key: &str,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/tasks", self.base_url))
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let accepted: SubmitResponse = Self::parse_response(response).await?;
        Ok(accepted.task_id)
    }

    /// Submit an enhancement task for an already-generated result.
    ///
    /// Sends `POST /tasks/{task_id}/enhance` with the source result URL.
    pub async fn submit_enhancement(
        &self,
        source_task_id: &str,
        source_url: &str,
        api_key: &str,
    ) -> Result<String, ProviderError> {
        let body = serde_json::json!({ "source_url": source_url });

        let response = self
            .client
            .post(format!("{}/tasks/{}/enhance", self.base_url, source_task_id))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let accepted: SubmitResponse = Self::parse_response(response).await?;
        Ok(accepted.task_id)
    }

    /// Fetch the current state of a task.
    ///
    /// Sends `GET /tasks/{task_id}`. Returns `None` when the provider's
    /// payload cannot be interpreted; the poller logs and retries on the
    /// next tick.
    pub async fn fetch_status(
        &self,
        task_id: &str,
        api_key: &str,
    ) -> Result<Option<TaskState>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/tasks/{}", self.base_url, task_id))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let payload: StatusPayload = Self::parse_response(response).await?;
        Ok(TaskState::from_payload(&payload))
    }

    // ---- private helpers ----

    /// Split a non-success response into Rejected (4xx) or Unavailable
    /// (5xx), preserving the body for diagnostics.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if status.is_client_error() {
            Err(ProviderError::Rejected {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(ProviderError::Unavailable(format!(
                "upstream returned {status}: {body}"
            )))
        }
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let response = Self::ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("malformed provider response: {e}")))
    }
}
