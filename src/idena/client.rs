//! Client for the Idena public API.

use super::SessionError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::time::Duration;

/// Maximum number of idle connections to keep per host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// Envelope every Idena API response is wrapped in.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

/// Last epoch summary. Only the validation time is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub validation_time: String,
}

/// Outbound calls the sign-in flow makes to Idena.
#[async_trait]
pub trait IdenaApi: Send + Sync {
    /// Recover the address that produced `signature` over `value`.
    async fn signature_address(&self, value: &str, signature: &str)
        -> Result<String, SessionError>;

    /// Fetch the last epoch.
    async fn last_epoch(&self) -> Result<Epoch, SessionError>;

    /// GET `path` and return the JSON body. Any status other than 200 fails.
    async fn get(&self, path: &str) -> Result<Value, SessionError>;
}

/// [`IdenaApi`] over HTTP.
pub struct HttpIdenaApi {
    base_url: String,
    http_client: Client,
}

impl HttpIdenaApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SessionError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .build()
            .map_err(|e| SessionError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, SessionError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http_client.get(&url).query(query).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(path = %path, status = status.as_u16(), "Idena API request failed");
            return Err(SessionError::Upstream {
                method: format!("get {}", path),
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Value>().await?)
    }

    async fn fetch_result<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SessionError> {
        let body = self.fetch(path, query).await?;
        let envelope: ApiResponse<T> =
            serde_json::from_value(body).map_err(|e| SessionError::Decode(e.to_string()))?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl IdenaApi for HttpIdenaApi {
    async fn signature_address(
        &self,
        value: &str,
        signature: &str,
    ) -> Result<String, SessionError> {
        self.fetch_result(
            "/api/SignatureAddress",
            &[("value", value), ("signature", signature)],
        )
        .await
    }

    async fn last_epoch(&self) -> Result<Epoch, SessionError> {
        self.fetch_result("/api/epoch/last", &[]).await
    }

    async fn get(&self, path: &str) -> Result<Value, SessionError> {
        self.fetch(path, &[]).await
    }
}
