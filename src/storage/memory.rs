//! In-process session store.
//!
//! Expiry is decided by comparing each record's `expires_at` with the
//! injected [`Clock`], so an expired session is invisible as soon as the clock
//! passes it. Memory is reclaimed either by a per-session timer task or by
//! [`MemorySessionStore::sweep`], depending on [`ExpiryMode`].

use super::{SessionStore, StoreError};
use crate::clock::Clock;
use crate::idena::token::generate_session_token;
use crate::models::Session;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// How expired sessions get removed from memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryMode {
    /// One tokio task per session deletes it once its TTL has elapsed.
    Timer,
    /// Expired sessions are evicted by periodic calls to `sweep`.
    Sweep,
}

impl std::str::FromStr for ExpiryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timer" => Ok(ExpiryMode::Timer),
            "sweep" => Ok(ExpiryMode::Sweep),
            _ => Err(format!("Invalid expiry mode: {}", s)),
        }
    }
}

struct Entry {
    session: Session,
    expires_at: DateTime<Utc>,
}

struct Inner {
    sessions: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    mode: ExpiryMode,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Session store backed by a mutex-guarded map.
#[derive(Clone)]
pub struct MemorySessionStore {
    inner: Arc<Inner>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>, mode: ExpiryMode) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                ttl,
                clock,
                mode,
            }),
        }
    }

    pub fn mode(&self) -> ExpiryMode {
        self.inner.mode
    }

    /// Number of records held, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict every expired session. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.inner.clock.now();
        let mut sessions = self.inner.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    fn schedule_expiry(&self, token: String) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                action = "expiry_not_scheduled",
                "No tokio runtime; session will only expire lazily"
            );
            return;
        };

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let ttl = self.inner.ttl;
        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(inner) = inner.upgrade() {
                // The flow may have finished or the session may be gone already.
                if inner.lock().remove(&token).is_some() {
                    tracing::debug!(action = "session_expired", "Session timer fired");
                }
            }
        });
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self) -> Result<String, StoreError> {
        let token = generate_session_token();
        let expires_at = self.inner.expires_at(self.inner.clock.now());

        self.inner.lock().insert(
            token.clone(),
            Entry {
                session: Session::new(token.clone()),
                expires_at,
            },
        );

        if self.inner.mode == ExpiryMode::Timer {
            self.schedule_expiry(token.clone());
        }

        Ok(token)
    }

    async fn get(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let now = self.inner.clock.now();
        let mut sessions = self.inner.lock();

        let expired = match sessions.get(token) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.session.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(token);
        }
        Ok(None)
    }

    async fn update(&self, session: &Session) -> Result<bool, StoreError> {
        let now = self.inner.clock.now();
        let mut sessions = self.inner.lock();

        let expired = match sessions.get_mut(&session.token) {
            Some(entry) if entry.expires_at > now => {
                entry.session = session.clone();
                return Ok(true);
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(&session.token);
        }
        Ok(false)
    }

    async fn replace(&self, current: &Session, updated: &Session) -> Result<bool, StoreError> {
        let now = self.inner.clock.now();
        let mut sessions = self.inner.lock();

        // Compare and write under one lock acquisition.
        let expired = match sessions.get_mut(&current.token) {
            Some(entry) if entry.expires_at > now => {
                if entry.session != *current {
                    return Ok(false);
                }
                entry.session = updated.clone();
                return Ok(true);
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(&current.token);
        }
        Ok(false)
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        self.inner.lock().remove(token);
        Ok(())
    }
}
