//! Pending authorization challenges
//!
//! State, nonce and PKCE verifier for a sign-in that has been sent to the
//! authorization server and not yet come back.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// How long the user has to finish signing in at the provider
pub const CHALLENGE_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChallenge {
    pub state: String,
    pub nonce: String,
    pub code_verifier: String,
    /// Local URL to land on once signed in
    pub return_url: String,
    pub created_at: i64,
}

impl PendingChallenge {
    pub fn new(return_url: impl Into<String>) -> Self {
        Self {
            state: generate_random_string(32),
            nonce: generate_random_string(32),
            code_verifier: generate_random_string(32),
            return_url: return_url.into(),
            created_at: Utc::now().timestamp(),
        }
    }

    pub fn code_challenge(&self) -> String {
        code_challenge(&self.code_verifier)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now - self.created_at > CHALLENGE_TTL_SECS
    }

    pub fn matches_state(&self, state: &str) -> bool {
        self.state.as_bytes().ct_eq(state.as_bytes()).into()
    }
}

/// URL-safe random token of `length` random bytes.
pub fn generate_random_string(length: usize) -> String {
    let bytes: Vec<u8> = (0..length).map(|_| rand::thread_rng().gen()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// PKCE S256 challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Keep only local return URLs; anything else goes home.
pub fn sanitize_return_url(url: Option<&str>) -> String {
    match url.map(str::trim) {
        Some(url) if is_local_url(url) => url.to_string(),
        _ => "/".to_string(),
    }
}

fn is_local_url(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}
