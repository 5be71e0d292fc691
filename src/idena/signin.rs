//! Idena challenge-response sign-in.
//!
//! Flow per session token:
//! 1. `init_session`: empty session, expires after the store TTL
//! 2. `start_session`: bind the claimed address and issue a nonce (once)
//! 3. `authenticate`: check the Idena signature over the nonce (once)
//! 4. `identity_state` / `identity_age` / `identity_stake`: authenticated
//!    queries against the Idena API for the bound address

use super::client::IdenaApi;
use super::token::generate_challenge_nonce;
use super::SessionError;
use crate::models::{IdentityAge, IdentityStake, IdentityState, Session};
use crate::storage::SessionStore;
use serde_json::Value;
use std::sync::Arc;

/// Placeholder in endpoint templates replaced by the session's address.
pub const ADDRESS_PLACEHOLDER: &str = "_address_";

const IDENTITY_PATH: &str = "/api/identity/_address_";
const IDENTITY_AGE_PATH: &str = "/api/identity/_address_/age";
const ADDRESS_PATH: &str = "/api/address/_address_";

/// Result of [`IdenaSignIn::start_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Nonce issued; the client must sign it.
    Started(String),
    /// A nonce was already issued for this session. Nothing changed.
    AlreadyStarted,
    NotFound,
}

/// Result of [`IdenaSignIn::authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Signature recovered to the bound address and was recorded.
    Authenticated,
    /// Signature did not match, or recovery failed. The session stays unsigned.
    Rejected,
    /// A signature was already recorded. Nothing changed.
    AlreadySigned,
    /// No address is bound yet.
    NotStarted,
    NotFound,
}

/// Identity API response for the session's address.
#[derive(Debug, Clone, PartialEq)]
pub struct Proxied {
    pub address: String,
    pub data: Value,
}

/// Session-based Idena sign-in over a [`SessionStore`] and an [`IdenaApi`].
pub struct IdenaSignIn {
    store: Arc<dyn SessionStore>,
    api: Arc<dyn IdenaApi>,
}

impl IdenaSignIn {
    pub fn new(store: Arc<dyn SessionStore>, api: Arc<dyn IdenaApi>) -> Self {
        Self { store, api }
    }

    /// Create a session and return its token.
    pub async fn init_session(&self) -> Result<String, SessionError> {
        let token = self.store.create().await?;
        tracing::info!(action = "session_created", "Idena session created");
        Ok(token)
    }

    /// Bind `address` to the session and issue the nonce to sign.
    ///
    /// Concurrent starts on one token bind exactly one address; the others
    /// see `AlreadyStarted`.
    pub async fn start_session(
        &self,
        token: &str,
        address: &str,
    ) -> Result<StartOutcome, SessionError> {
        loop {
            let Some(session) = self.store.get(token).await? else {
                return Ok(StartOutcome::NotFound);
            };
            if session.nonce.is_some() {
                return Ok(StartOutcome::AlreadyStarted);
            }

            let nonce = generate_challenge_nonce();
            let mut started = session.clone();
            started.nonce = Some(nonce.clone());
            started.address = Some(address.to_string());

            if self.store.replace(&session, &started).await? {
                tracing::info!(action = "signin_started", address = %address, "Nonce issued");
                return Ok(StartOutcome::Started(nonce));
            }
        }
    }

    /// Verify `signature` over the session nonce.
    ///
    /// Recovery failures count as a rejected signature, not an error. Of
    /// concurrent valid signatures on one token only the first write is
    /// kept; the others see `AlreadySigned`.
    pub async fn authenticate(
        &self,
        token: &str,
        signature: &str,
    ) -> Result<AuthOutcome, SessionError> {
        let Some(mut session) = self.store.get(token).await? else {
            return Ok(AuthOutcome::NotFound);
        };
        if session.is_authenticated() {
            return Ok(AuthOutcome::AlreadySigned);
        }
        let (Some(address), Some(nonce)) = (session.address.clone(), session.nonce.as_deref())
        else {
            return Ok(AuthOutcome::NotStarted);
        };

        let recovered = match self.api.signature_address(nonce, signature).await {
            Ok(recovered) => recovered,
            Err(e) => {
                tracing::warn!(action = "auth_failed", error = %e, "Signature recovery failed");
                return Ok(AuthOutcome::Rejected);
            }
        };

        if recovered.is_empty() || !recovered.eq_ignore_ascii_case(&address) {
            tracing::warn!(action = "auth_failed", address = %address, "Signature address mismatch");
            return Ok(AuthOutcome::Rejected);
        }

        // Nonce and address never change once bound, so the recovered
        // address stays valid across retries.
        loop {
            let mut signed = session.clone();
            signed.signature = Some(signature.to_string());
            if self.store.replace(&session, &signed).await? {
                break;
            }

            match self.store.get(token).await? {
                None => return Ok(AuthOutcome::NotFound),
                Some(current) if current.is_authenticated() => {
                    tracing::warn!(
                        action = "auth_conflict",
                        address = %address,
                        "Session signed by a concurrent request"
                    );
                    return Ok(AuthOutcome::AlreadySigned);
                }
                Some(current) => session = current,
            }
        }

        tracing::info!(action = "auth_success", address = %address, "Idena identity authenticated");
        Ok(AuthOutcome::Authenticated)
    }

    async fn find_session(&self, token: &str) -> Result<Session, SessionError> {
        self.store
            .get(token)
            .await?
            .ok_or(SessionError::NotFound)
    }

    /// GET `endpoint` with the bound address substituted for
    /// [`ADDRESS_PLACEHOLDER`]. Requires a completed authentication.
    pub async fn authenticated_request(
        &self,
        token: &str,
        endpoint: &str,
    ) -> Result<Proxied, SessionError> {
        let session = self.find_session(token).await?;
        if !session.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        let address = session.address.ok_or(SessionError::NotAuthenticated)?;

        let path = endpoint.replacen(ADDRESS_PLACEHOLDER, &address, 1);
        let data = self.api.get(&path).await?;

        Ok(Proxied { address, data })
    }

    /// Validation time of the last epoch, fetched once per session.
    pub async fn validation_time(&self, token: &str) -> Result<String, SessionError> {
        let mut session = self.find_session(token).await?;
        if let Some(cached) = session.cached_expiration_date {
            return Ok(cached);
        }

        let validation_time = self.api.last_epoch().await?.validation_time;
        session.cached_expiration_date = Some(validation_time.clone());
        if !self.store.update(&session).await? {
            return Err(SessionError::NotFound);
        }

        Ok(validation_time)
    }

    pub async fn identity_state(&self, token: &str) -> Result<IdentityState, SessionError> {
        let proxied = self.authenticated_request(token, IDENTITY_PATH).await?;
        let state = proxied.data["result"]["state"]
            .as_str()
            .ok_or_else(|| SessionError::Decode("missing identity state".to_string()))?
            .to_string();
        let expiration_date = self.validation_time(token).await?;

        Ok(IdentityState {
            address: proxied.address,
            state,
            expiration_date,
        })
    }

    pub async fn identity_age(&self, token: &str) -> Result<IdentityAge, SessionError> {
        let proxied = self.authenticated_request(token, IDENTITY_AGE_PATH).await?;
        let age = as_u64(&proxied.data["result"])
            .ok_or_else(|| SessionError::Decode("missing identity age".to_string()))?;
        let expiration_date = self.validation_time(token).await?;

        Ok(IdentityAge {
            address: proxied.address,
            age,
            expiration_date,
        })
    }

    pub async fn identity_stake(&self, token: &str) -> Result<IdentityStake, SessionError> {
        let proxied = self.authenticated_request(token, ADDRESS_PATH).await?;
        let stake = as_f64(&proxied.data["result"]["stake"])
            .ok_or_else(|| SessionError::Decode("missing stake".to_string()))?;
        let expiration_date = self.validation_time(token).await?;

        Ok(IdentityStake {
            address: proxied.address,
            stake,
            expiration_date,
        })
    }
}

// Idena serializes numbers either as JSON numbers or as decimal strings.
fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str()?.trim().parse().ok())
}

fn as_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str()?.trim().parse().ok())
}
