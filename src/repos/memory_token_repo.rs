use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::repos::error::StoreResult;
use crate::repos::token_repo::{AccessToken, TokenStore};

/// Process-local token store.
///
/// Used when no `TOKEN_STORE_URL` is configured, and by tests.
/// Tokens are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryTokenRepo {
    tokens: RwLock<HashMap<String, AccessToken>>,
}

impl MemoryTokenRepo {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenRepo {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find_one(&self, access_token: &str) -> StoreResult<Option<AccessToken>> {
        Ok(self.tokens.read().await.get(access_token).cloned())
    }

    async fn remove(&self, access_token: &str, client_id: &str) -> StoreResult<u64> {
        let mut tokens = self.tokens.write().await;

        let owned = tokens
            .get(access_token)
            .is_some_and(|t| t.client_id == client_id);
        if !owned {
            return Ok(0);
        }

        tokens.remove(access_token);
        Ok(1)
    }

    async fn insert(&self, token: &AccessToken) -> StoreResult<()> {
        self.tokens
            .write()
            .await
            .insert(token.access_token.clone(), token.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(access_token: &str, client_id: &str) -> AccessToken {
        AccessToken {
            access_token: access_token.into(),
            expires_at: 0,
            client_id: client_id.into(),
            scope: Vec::new(),
            username: "grandma".into(),
            subject_id: "sub-1".into(),
        }
    }

    #[tokio::test]
    async fn remove_requires_matching_client() {
        let repo = MemoryTokenRepo::new();
        repo.insert(&token("t1", "idora")).await.unwrap();

        assert_eq!(repo.remove("t1", "other").await.unwrap(), 0);
        assert!(repo.find_one("t1").await.unwrap().is_some());

        assert_eq!(repo.remove("t1", "idora").await.unwrap(), 1);
        assert!(repo.find_one("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn redundant_remove_returns_zero() {
        let repo = MemoryTokenRepo::new();
        repo.insert(&token("t1", "idora")).await.unwrap();

        assert_eq!(repo.remove("t1", "idora").await.unwrap(), 1);
        assert_eq!(repo.remove("t1", "idora").await.unwrap(), 0);
        assert_eq!(repo.len().await, 0);
    }
}
