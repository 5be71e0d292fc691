//! Token and nonce generation for Idena sign-in.

use rand::Rng;

const TOKEN_PREFIX: &str = "idena-";
const NONCE_PREFIX: &str = "signin-";

fn random_hex() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Generate a cryptographically random session token.
///
/// `idena-` followed by 64 hex characters (32 random bytes).
pub fn generate_session_token() -> String {
    format!("{}{}", TOKEN_PREFIX, random_hex())
}

/// Generate a cryptographically random challenge nonce.
///
/// `signin-` followed by 64 hex characters (32 random bytes).
pub fn generate_challenge_nonce() -> String {
    format!("{}{}", NONCE_PREFIX, random_hex())
}
