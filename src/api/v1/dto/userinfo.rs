use serde::Serialize;

use crate::repos::AccessToken;

#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub sub: String,
    pub username: String,
    pub client_id: String,
    pub scope: Vec<String>,
    pub expires_at: i64,
}

impl From<AccessToken> for UserInfoResponse {
    fn from(token: AccessToken) -> Self {
        Self {
            sub: token.subject_id,
            username: token.username,
            client_id: token.client_id,
            scope: token.scope,
            expires_at: token.expires_at,
        }
    }
}
