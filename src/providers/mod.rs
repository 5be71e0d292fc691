//! Stamp providers: stateless checks that an address satisfies a condition.

pub mod lens;

use crate::models::{RequestPayload, VerifiedPayload};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub use lens::LensProvider;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("unknown provider type: {0}")]
    UnknownProvider(String),

    #[error("post {url} returned status code {status}")]
    Upstream { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// A single verification check, selected by the payload's `type`.
#[async_trait]
pub trait Provider: Send + Sync {
    fn provider_type(&self) -> &'static str;

    async fn verify(&self, payload: &RequestPayload) -> Result<VerifiedPayload, ProviderError>;
}

/// Providers keyed by type.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider, replacing any previous one with the same type.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.provider_type(), provider);
    }

    pub fn get(&self, provider_type: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(provider_type)
    }

    pub async fn verify(&self, payload: &RequestPayload) -> Result<VerifiedPayload, ProviderError> {
        let provider = self
            .get(&payload.provider_type)
            .ok_or_else(|| ProviderError::UnknownProvider(payload.provider_type.clone()))?;

        let verified = provider.verify(payload).await?;
        tracing::info!(
            action = "provider_verified",
            provider = %payload.provider_type,
            address = %payload.address,
            valid = verified.valid,
            "Provider check completed"
        );
        Ok(verified)
    }
}
