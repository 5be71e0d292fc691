//! Lens provider: the address owns a Lens token older than a minimum age.
//!
//! Subgraphs are queried in order. The first one whose oldest token for the
//! address is old enough decides the result; later subgraphs are not queried.

use super::{Provider, ProviderError};
use crate::clock::Clock;
use crate::models::{Record, RequestPayload, VerifiedPayload};
use async_trait::async_trait;
use chrono::TimeDelta;
use reqwest::{Client, StatusCode};
use serde::{de, Deserialize, Deserializer};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const PROVIDER_TYPE: &str = "Lens";

/// Default subgraphs, checked in this order.
pub const LENS_SUBGRAPHS: [&str; 2] = [
    "https://api.thegraph.com/subgraphs/name/lens-xyz/lens",
    "https://api.thegraph.com/subgraphs/name/lens-xyz/lens-xdai",
];

/// 15 days.
pub const MIN_TOKEN_AGE_SECS: u64 = 15 * 24 * 3600;

const TOKENS_QUERY: &str = r#"
query AccountTokens($address: ID!) {
  account(id: $address) {
    tokens(orderBy: created, orderDirection: asc) {
      id
      created
    }
  }
}
"#;

#[derive(Debug, Clone, Deserialize)]
struct Token {
    id: String,
    /// Seconds since the Unix epoch.
    #[serde(deserialize_with = "unix_seconds")]
    created: i64,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(default)]
    tokens: Vec<Token>,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    account: Option<Account>,
}

#[derive(Debug, Deserialize)]
struct GraphResponse {
    data: Option<AccountData>,
}

// The Graph serializes BigInt as a string, older deployments as a number.
fn unix_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom("created out of range")),
        Value::String(s) => s.trim().parse().map_err(de::Error::custom),
        other => Err(de::Error::custom(format!("invalid created value: {}", other))),
    }
}

pub struct LensProvider {
    subgraphs: Vec<String>,
    min_token_age: TimeDelta,
    http_client: Client,
    clock: Arc<dyn Clock>,
}

impl LensProvider {
    pub fn new(
        subgraphs: Vec<String>,
        min_token_age: Duration,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            subgraphs,
            min_token_age: TimeDelta::from_std(min_token_age).unwrap_or(TimeDelta::MAX),
            http_client,
            clock,
        })
    }

    async fn fetch_tokens(&self, url: &str, address: &str) -> Result<Vec<Token>, ProviderError> {
        let transport = |e: reqwest::Error| ProviderError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .http_client
            .post(url)
            .json(&json!({
                "query": TOKENS_QUERY,
                "variables": { "address": address },
            }))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ProviderError::Upstream {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body: GraphResponse = response.json().await.map_err(|e| ProviderError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(body
            .data
            .and_then(|data| data.account)
            .map(|account| account.tokens)
            .unwrap_or_default())
    }

    /// Token ids if the oldest token is strictly older than the minimum age.
    fn qualifying_tokens(&self, tokens: &[Token]) -> Option<Vec<String>> {
        let oldest = tokens.iter().min_by_key(|token| token.created)?;
        let age_ms = self
            .clock
            .now()
            .timestamp_millis()
            .saturating_sub(oldest.created.saturating_mul(1000));

        if age_ms > self.min_token_age.num_milliseconds() {
            Some(tokens.iter().map(|token| token.id.clone()).collect())
        } else {
            None
        }
    }
}

#[async_trait]
impl Provider for LensProvider {
    fn provider_type(&self) -> &'static str {
        PROVIDER_TYPE
    }

    async fn verify(&self, payload: &RequestPayload) -> Result<VerifiedPayload, ProviderError> {
        for url in &self.subgraphs {
            let tokens = self.fetch_tokens(url, &payload.address).await?;

            if let Some(ids) = self.qualifying_tokens(&tokens) {
                tracing::debug!(subgraph = %url, tokens = ids.len(), "Lens token age satisfied");
                return Ok(VerifiedPayload {
                    valid: true,
                    record: Record {
                        tokens: Some(ids.join(",")),
                    },
                });
            }
        }

        Ok(VerifiedPayload {
            valid: false,
            record: Record::default(),
        })
    }
}
