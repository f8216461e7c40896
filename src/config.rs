/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, token store, user directory, redirect origins, bootstrap token)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::services::auth::{RedirectPolicy, UserDirectory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Startup seeding of a long-lived token (see `services::auth::bootstrap`).
#[derive(Clone)]
pub struct BootstrapConfig {
    pub access_token: String,
    pub username: String,
    pub client_id: String,
    pub scope: Vec<String>,
    pub ttl_seconds: u64,
}

impl fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("access_token", &"<redacted>")
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // None -> in-memory token store
    pub token_store_url: Option<String>,
    pub token_store_prefix: String,

    pub users: UserDirectory,
    // empty -> /login refuses every redirect_uri
    pub redirect_policy: RedirectPolicy,
    pub bootstrap: Option<BootstrapConfig>,

    pub request_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. `from_env` passes the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = get("APP_ENV")
            .map(|raw| AppEnv::parse(&raw))
            .unwrap_or(AppEnv::Development);

        let token_store_url = get("TOKEN_STORE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let token_store_prefix =
            get("TOKEN_STORE_PREFIX").unwrap_or_else(|| "access_token".to_string());

        let users = load_users(&get)?;
        let redirect_policy = load_redirect_policy(&get)?;
        let bootstrap = load_bootstrap(&get)?;

        let request_body_limit_bytes = get("REQUEST_BODY_LIMIT_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        Ok(Self {
            addr,
            app_env,
            token_store_url,
            token_store_prefix,
            users,
            redirect_policy,
            bootstrap,
            request_body_limit_bytes,
        })
    }
}

// AUTH_USERS_FILE wins over inline AUTH_USERS. Neither set -> empty directory.
fn load_users<F>(get: &F) -> Result<UserDirectory, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = get("AUTH_USERS_FILE") {
        let raw =
            std::fs::read_to_string(path).map_err(|_| ConfigError::Invalid("AUTH_USERS_FILE"))?;
        return UserDirectory::from_json(&raw).map_err(|_| ConfigError::Invalid("AUTH_USERS_FILE"));
    }

    match get("AUTH_USERS") {
        Some(raw) => UserDirectory::from_json(&raw).map_err(|_| ConfigError::Invalid("AUTH_USERS")),
        None => Ok(UserDirectory::default()),
    }
}

// comma separated, e.g. "https://app.example,http://localhost:3000"
fn load_redirect_policy<F>(get: &F) -> Result<RedirectPolicy, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = get("AUTH_REDIRECT_ORIGINS").unwrap_or_default();
    let origins = raw.split(',').map(str::trim).filter(|s| !s.is_empty());

    RedirectPolicy::new(origins).map_err(|_| ConfigError::Invalid("AUTH_REDIRECT_ORIGINS"))
}

fn load_bootstrap<F>(get: &F) -> Result<Option<BootstrapConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(access_token) = get("BOOTSTRAP_ACCESS_TOKEN").filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };

    let ttl_seconds = match get("BOOTSTRAP_TTL_SECONDS") {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid("BOOTSTRAP_TTL_SECONDS"))?,
        None => 60 * 60 * 24 * 365 * 10, // 10 years
    };

    let scope = get("BOOTSTRAP_SCOPE")
        .unwrap_or_else(|| "authenticate_user".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    Ok(Some(BootstrapConfig {
        access_token,
        username: get("BOOTSTRAP_USERNAME").unwrap_or_else(|| "grandma".to_string()),
        client_id: get("BOOTSTRAP_CLIENT_ID").unwrap_or_else(|| "idora".to_string()),
        scope,
        ttl_seconds,
    }))
}
