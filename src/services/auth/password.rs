/*
 * Responsibility
 * - 静的な user directory (username -> password, sub) の保持
 * - username/password の照合 (定数時間比較)
 *
 * Notes
 * - password は平文で保持している。ハッシュ化は未対応 (DESIGN.md 参照)
 * - 失敗時のログに password や directory の中身を出さない
 */
use std::collections::HashMap;

use serde::Deserialize;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("unknown username or password")]
    InvalidCredentials,
}

#[derive(Clone, Deserialize)]
pub struct User {
    pub password: String,
    #[serde(rename = "sub")]
    pub subject_id: String,
}

// Hand-written so a stray `{:?}` can't leak the password.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("password", &"<redacted>")
            .field("subject_id", &self.subject_id)
            .finish()
    }
}

/// Read-only username -> user mapping, loaded once at startup.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct UserDirectory {
    users: HashMap<String, User>,
}

impl UserDirectory {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn with_user(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        subject_id: impl Into<String>,
    ) -> Self {
        self.users.insert(
            username.into(),
            User {
                password: password.into(),
                subject_id: subject_id.into(),
            },
        );
        self
    }

    pub fn get(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct PasswordAuthenticator {
    directory: UserDirectory,
}

impl PasswordAuthenticator {
    pub fn new(directory: UserDirectory) -> Self {
        Self { directory }
    }

    /// Check a username/password pair. Returns the user's subject id.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let matched = self.directory.get(username).filter(|user| {
            bool::from(user.password.as_bytes().ct_eq(password.as_bytes()))
        });

        match matched {
            Some(user) => Ok(user.subject_id.clone()),
            None => {
                tracing::warn!(username = %username, "user login failed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}
