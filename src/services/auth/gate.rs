//! Token gate: decide whether a presented access token lets the request through.
//!
//! - unknown token        -> `NotFound`
//! - `expires_at <= now`  -> `Expired`, and the token is queued for removal
//! - store failure        -> `Store` (must not be reported as "not found")

use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::repos::{AccessToken, StoreError, TokenStore};
use crate::services::auth::cleanup::{CleanupQueue, ExpiredToken};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("no access token presented")]
    Missing,
    #[error("access token not found")]
    NotFound,
    #[error("access token expired")]
    Expired,
    #[error("token store failure: {0}")]
    Store(#[from] StoreError),
}

pub struct TokenGate {
    store: Arc<dyn TokenStore>,
    cleanup: CleanupQueue,
}

impl TokenGate {
    pub fn new(store: Arc<dyn TokenStore>, cleanup: CleanupQueue) -> Self {
        Self { store, cleanup }
    }

    pub fn store(&self) -> &dyn TokenStore {
        self.store.as_ref()
    }

    pub async fn authorize(&self, candidate: Option<&str>) -> Result<AccessToken, GateError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.authorize_at(candidate, now_ms).await
    }

    /// Same as [`authorize`](Self::authorize) with an explicit clock (epoch ms).
    pub async fn authorize_at(
        &self,
        candidate: Option<&str>,
        now_ms: i64,
    ) -> Result<AccessToken, GateError> {
        // A missing or empty token can never match a record, so skip the round trip.
        let candidate = candidate
            .filter(|c| !c.is_empty())
            .ok_or(GateError::Missing)?;

        let token = self
            .store
            .find_one(candidate)
            .await?
            .ok_or(GateError::NotFound)?;

        if token.is_expired_at(now_ms) {
            self.cleanup.enqueue(ExpiredToken {
                access_token: token.access_token,
                client_id: token.client_id,
            });
            return Err(GateError::Expired);
        }

        Ok(token)
    }
}

/// Short, non-reversible identifier for a token, safe to put in logs.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let hex = format!("{digest:x}");
    hex[..12].to_string()
}
