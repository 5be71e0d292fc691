//! Session storage.
//!
//! [`SessionStore`] owns every [`Session`] record. Callers never hold a
//! session across calls; each operation looks the record up by token.
//!
//! Backends:
//! - [`memory::MemorySessionStore`]: in-process map, clock-driven expiry
//! - [`session::RedisSessionStore`]: `session:{token}` keys with native TTL

pub mod memory;
pub mod session;

use crate::models::Session;
use async_trait::async_trait;

pub use memory::{ExpiryMode, MemorySessionStore};
pub use session::RedisSessionStore;

/// Session TTL used when none is configured (5 minutes).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Token-keyed session storage with a bounded lifetime per record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert an empty session under a fresh token and schedule its expiry.
    async fn create(&self) -> Result<String, StoreError>;

    /// Look a session up. Expired sessions are reported as absent.
    async fn get(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Overwrite a live session without touching its expiry.
    ///
    /// Returns `false` if the session no longer exists.
    async fn update(&self, session: &Session) -> Result<bool, StoreError>;

    /// Overwrite a live session with `updated` only if the stored record
    /// still equals `current`. Expiry is left untouched.
    ///
    /// Returns `false` if the session changed since `current` was read, or
    /// no longer exists.
    async fn replace(&self, current: &Session, updated: &Session) -> Result<bool, StoreError>;

    /// Remove a session. No-op if it is already gone.
    async fn delete(&self, token: &str) -> Result<(), StoreError>;
}
