/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - gate: TokenGate (token store + cleanup queue), authenticator: user directory
 *   - redirect_policy: /login の redirect_uri 許可 origin
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::{PasswordAuthenticator, RedirectPolicy, TokenGate};

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<TokenGate>,
    pub authenticator: Arc<PasswordAuthenticator>,
    pub redirect_policy: Arc<RedirectPolicy>,
}

impl AppState {
    pub fn new(
        gate: Arc<TokenGate>,
        authenticator: Arc<PasswordAuthenticator>,
        redirect_policy: Arc<RedirectPolicy>,
    ) -> Self {
        Self {
            gate,
            authenticator,
            redirect_policy,
        }
    }
}
