//! Redis-backed session store.
//!
//! Redis key pattern:
//! - `session:{token}` — session data (JSON), expires with the session TTL
//!
//! Updates use `SET .. XX KEEPTTL`: a write never recreates a session Redis
//! already expired and never extends its lifetime. Guarded writes compare the
//! stored JSON and set the new value in one Lua script.

use super::{SessionStore, StoreError};
use crate::idena::token::generate_session_token;
use crate::models::Session;
use async_trait::async_trait;
use redis::AsyncCommands;

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

/// Session store shared between processes through Redis.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self) -> Result<String, StoreError> {
        let mut con = self.connection().await?;
        let token = generate_session_token();
        let json = serde_json::to_string(&Session::new(token.clone()))?;

        con.set_ex::<_, _, ()>(session_key(&token), json, self.ttl_secs)
            .await?;

        Ok(token)
    }

    async fn get(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let mut con = self.connection().await?;
        let json: Option<String> = con.get(session_key(token)).await?;

        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, session: &Session) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        let json = serde_json::to_string(session)?;

        let written: bool = con
            .set_options(
                session_key(&session.token),
                json,
                redis::SetOptions::default()
                    .conditional_set(redis::ExistenceCheck::XX)
                    .with_expiration(redis::SetExpiry::KEEPTTL),
            )
            .await?;

        Ok(written)
    }

    async fn replace(&self, current: &Session, updated: &Session) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        let expected = serde_json::to_string(current)?;
        let json = serde_json::to_string(updated)?;

        // Lua script for atomic compare + SET (a missing key never matches)
        let script = redis::Script::new(
            r"
            local val = redis.call('GET', KEYS[1])
            if val == ARGV[1] then
                redis.call('SET', KEYS[1], ARGV[2], 'KEEPTTL')
                return 1
            end
            return 0
            ",
        );

        let swapped: i64 = script
            .key(session_key(&current.token))
            .arg(expected)
            .arg(json)
            .invoke_async(&mut con)
            .await?;

        Ok(swapped == 1)
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        con.del::<_, ()>(session_key(token)).await?;
        Ok(())
    }
}
