use std::sync::Arc;

use async_trait::async_trait;

use crate::repos::error::StoreResult;
use crate::repos::token_repo::{AccessToken, TokenStore};
use crate::services::cache::{CacheClient, CacheError, ValkeyClient};

/// Valkey-backed token store (Redis protocol).
///
/// Each token is a JSON document stored at `<prefix>:<access_token>`.
/// No TTL is set on the key; expiry is judged by the gate from `expires_at`.
#[derive(Clone)]
pub struct ValkeyTokenRepo<C: CacheClient> {
    cache: Arc<C>,
    prefix: String,
}

impl ValkeyTokenRepo<ValkeyClient> {
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = ValkeyClient::new(url).await?;
        Ok(Self::new_with_cache(Arc::new(client), prefix))
    }
}

impl<C: CacheClient> ValkeyTokenRepo<C> {
    pub fn new_with_cache(cache: Arc<C>, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, access_token: &str) -> String {
        format!("{}:{}", self.prefix, access_token)
    }
}

#[async_trait]
impl<C: CacheClient> TokenStore for ValkeyTokenRepo<C> {
    fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }

    async fn find_one(&self, access_token: &str) -> StoreResult<Option<AccessToken>> {
        let raw = self.cache.get_string(&self.key(access_token)).await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, access_token: &str, client_id: &str) -> StoreResult<u64> {
        let key = self.key(access_token);

        // GET then DEL is not atomic; a concurrent remover simply gets 0 back.
        let Some(raw) = self.cache.get_string(&key).await? else {
            return Ok(0);
        };
        let token: AccessToken = serde_json::from_str(&raw)?;
        if token.client_id != client_id {
            return Ok(0);
        }

        Ok(self.cache.del(&key).await?)
    }

    async fn insert(&self, token: &AccessToken) -> StoreResult<()> {
        let raw = serde_json::to_string(token)?;
        self.cache
            .set_string(&self.key(&token.access_token), &raw)
            .await?;
        Ok(())
    }
}
