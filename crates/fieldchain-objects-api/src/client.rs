//! HTTP client for the form builder's Objects API endpoints

use crate::config::ApiConfig;
use fieldchain_options::FetchError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Shared HTTP client
///
/// Cheap to clone; every source of a chain can hold one.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ApiConfig>,
}

impl ApiClient {
    /// Create client from configuration
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();
        Self {
            http,
            config: Arc::new(config),
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// GET `path` with `query` and decode the JSON body
    ///
    /// # Errors
    /// - `FetchError::Transport` / `FetchError::Timeout` if the request fails
    /// - `FetchError::Status` on a non-2xx response
    /// - `FetchError::Decode` if the body is not the expected JSON
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = self.config.url(path);
        debug!(url = %url, "GET");

        let response = self
            .http
            .get(&url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        Self::decode(response).await
    }

    /// POST a JSON body to `path` and decode the JSON response
    ///
    /// Sends the configured CSRF token as `X-CSRFToken`.
    ///
    /// # Errors
    /// Same as [`ApiClient::get_json`].
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.url(path);
        debug!(url = %url, "POST");

        let mut request = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(body);
        if let Some(token) = &self.config.csrf_token {
            request = request.header("X-CSRFToken", token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(&e))?;
        Self::decode(response).await
    }

    fn transport_error(&self, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                after_ms: self.config.request_timeout_ms,
            }
        } else {
            FetchError::Transport(error.to_string())
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}
