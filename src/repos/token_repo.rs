/*
 * Responsibility
 * - access token の保存形式 (AccessToken) の定義
 * - token store の抽象 (TokenStore)。backend は memory / valkey を差し替える
 */
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::repos::error::StoreResult;

/// An issued access token as persisted in the token store.
///
/// ```json
/// {
///   "access_token": "cFGxa1tYnSbXPqkvyqBExmCDAJuedtto",
///   "expires_at": 2508450996080,
///   "client_id": "idora",
///   "scope": ["authenticate_user"],
///   "username": "grandma",
///   "sub": "7B2A-BE88-08817Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Absolute expiry, epoch milliseconds.
    pub expires_at: i64,
    pub client_id: String,
    #[serde(default)]
    pub scope: Vec<String>,
    pub username: String,
    #[serde(rename = "sub")]
    pub subject_id: String,
}

impl AccessToken {
    /// A token is usable only while `now < expires_at`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }
}

/// Persistence for issued access tokens.
///
/// Implementations must be safe to share across requests (`Arc<dyn TokenStore>`).
/// The store does not sweep expired tokens on its own; the gate prunes them lazily.
#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    // Backend name for logs.
    fn backend_name(&self) -> &'static str;

    // Look a token up by its opaque string. `Ok(None)` when unknown.
    async fn find_one(&self, access_token: &str) -> StoreResult<Option<AccessToken>>;

    // Remove the token issued to `client_id`. Returns the number of removed records.
    //
    // Removing an already-removed token is not an error and returns 0, so
    // concurrent cleanups of the same expired token are harmless.
    async fn remove(&self, access_token: &str, client_id: &str) -> StoreResult<u64>;

    // Store a token, replacing any record with the same `access_token`.
    async fn insert(&self, token: &AccessToken) -> StoreResult<()>;
}
