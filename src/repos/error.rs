/*
 * Responsibility
 * - token store が上位に伝える意味の定義
 * - "見つからない" は Ok(None) で表し、ここには backend の失敗だけを置く
 */
use thiserror::Error;

use crate::services::cache::CacheError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store backend error: {0}")]
    Backend(#[from] CacheError),
    #[error("stored token is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
