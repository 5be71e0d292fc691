//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.
//! [`Session`] is the stored record owned by the session store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Session Models
// ============================================================================

/// One Idena sign-in attempt, keyed by its token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    /// Challenge the Idena app signs; set together with `address`.
    pub nonce: Option<String>,
    /// Identity address claimed at sign-in start.
    pub address: Option<String>,
    /// Signature over `nonce`; set once authentication succeeded.
    pub signature: Option<String>,
    /// Validation time of the last epoch, fetched on first use.
    pub cached_expiration_date: Option<String>,
}

impl Session {
    pub fn new(token: String) -> Self {
        Self {
            token,
            ..Default::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.signature.is_some()
    }
}

// ============================================================================
// Session API Models
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct InitSessionResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub token: String,
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub nonce: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    pub token: String,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    pub ok: bool,
}

/// Query string for the authenticated identity endpoints.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityState {
    pub address: String,
    pub state: String,
    pub expiration_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityAge {
    pub address: String,
    pub age: u64,
    pub expiration_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityStake {
    pub address: String,
    pub stake: f64,
    pub expiration_date: String,
}

// ============================================================================
// Provider Models
// ============================================================================

/// Verification request sent by the widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPayload {
    pub address: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub proofs: Value,
}

/// Provider-specific evidence attached to a verification result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<String>,
}

/// Outcome of a provider check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedPayload {
    pub valid: bool,
    pub record: Record,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new("idena-abc".to_string());
        assert_eq!(session.token, "idena-abc");
        assert!(session.nonce.is_none());
        assert!(session.address.is_none());
        assert!(session.signature.is_none());
        assert!(session.cached_expiration_date.is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_identity_payload_uses_camel_case() {
        let payload = IdentityAge {
            address: "0xabc".to_string(),
            age: 7,
            expiration_date: "2022-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["expirationDate"], "2022-01-01T00:00:00Z");
        assert_eq!(json["age"], 7);
    }

    #[test]
    fn test_record_omits_missing_tokens() {
        let payload = VerifiedPayload {
            valid: false,
            record: Record::default(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "valid": false, "record": {} }));
    }

    #[test]
    fn test_request_payload_type_field() {
        let payload: RequestPayload = serde_json::from_str(
            r#"{"address":"0x1","type":"Lens","version":"0.0.0","proofs":{}}"#,
        )
        .unwrap();
        assert_eq!(payload.provider_type, "Lens");
        assert_eq!(payload.version, "0.0.0");
    }
}
