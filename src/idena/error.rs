use crate::storage::StoreError;

/// Failures of the Idena sign-in flow.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found or expired")]
    NotFound,

    #[error("authentication not passed")]
    NotAuthenticated,

    #[error("{method} returned status code {status} instead of the expected 200")]
    Upstream { method: String, status: u16 },

    #[error("request to Idena API failed: {0}")]
    Transport(String),

    #[error("unexpected Idena API response: {0}")]
    Decode(String),

    #[error("session storage failed: {0}")]
    Storage(#[from] StoreError),
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SessionError::Decode(err.to_string())
        } else {
            SessionError::Transport(err.to_string())
        }
    }
}
