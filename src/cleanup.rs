//! Background sweep for expired in-memory sessions.
//!
//! Expired sessions are already invisible to lookups; the sweep only
//! reclaims their memory. Used with [`ExpiryMode::Sweep`](crate::storage::ExpiryMode).

use crate::storage::MemorySessionStore;
use std::time::Duration;

/// Run the sweep loop.
///
/// Evicts expired sessions every `interval`. Never returns.
pub async fn run_sweep_loop(store: MemorySessionStore, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let evicted = store.sweep();
        if evicted > 0 {
            tracing::info!(
                action = "sessions_swept",
                evicted = evicted,
                remaining = store.len(),
                "Expired sessions evicted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{ExpiryMode, SessionStore};
    use chrono::TimeDelta;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_sweep_loop_evicts_expired_sessions() {
        let clock = Arc::new(ManualClock::default());
        let store = MemorySessionStore::new(
            Duration::from_secs(300),
            clock.clone(),
            ExpiryMode::Sweep,
        );
        store.create().await.unwrap();
        store.create().await.unwrap();

        let handle = tokio::spawn(run_sweep_loop(store.clone(), Duration::from_secs(30)));

        // Not expired yet: a tick leaves both in place.
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(store.len(), 2);

        clock.advance(TimeDelta::seconds(300));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(store.is_empty());

        handle.abort();
    }
}
