//! One-time startup seeding of a long-lived access token.
//!
//! Used for demos/testing when the QR-code scanner app is not available:
//! the configured token is inserted once, bound to a directory user.
//! Failures are logged; they never stop the server.

use crate::config::BootstrapConfig;
use crate::repos::{AccessToken, StoreError, TokenStore};
use crate::services::auth::gate::token_fingerprint;
use crate::services::auth::password::UserDirectory;

#[derive(Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    Inserted,
    AlreadyPresent,
    UnknownUser,
}

pub async fn seed(
    store: &dyn TokenStore,
    directory: &UserDirectory,
    config: &BootstrapConfig,
    now_ms: i64,
) -> Result<SeedOutcome, StoreError> {
    if store.find_one(&config.access_token).await?.is_some() {
        return Ok(SeedOutcome::AlreadyPresent);
    }

    let Some(user) = directory.get(&config.username) else {
        return Ok(SeedOutcome::UnknownUser);
    };

    let ttl_ms = i64::try_from(config.ttl_seconds)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000);

    let token = AccessToken {
        access_token: config.access_token.clone(),
        expires_at: now_ms.saturating_add(ttl_ms),
        client_id: config.client_id.clone(),
        scope: config.scope.clone(),
        username: config.username.clone(),
        subject_id: user.subject_id.clone(),
    };
    store.insert(&token).await?;

    Ok(SeedOutcome::Inserted)
}

/// Run [`seed`] and log the result instead of returning it.
pub async fn seed_and_log(
    store: &dyn TokenStore,
    directory: &UserDirectory,
    config: &BootstrapConfig,
) {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let token = token_fingerprint(&config.access_token);

    match seed(store, directory, config, now_ms).await {
        Ok(SeedOutcome::Inserted) => tracing::info!(
            %token,
            username = %config.username,
            client_id = %config.client_id,
            "bootstrap access token seeded"
        ),
        Ok(SeedOutcome::AlreadyPresent) => {
            tracing::debug!(%token, "bootstrap access token already present")
        }
        Ok(SeedOutcome::UnknownUser) => tracing::warn!(
            username = %config.username,
            "bootstrap user is not in the user directory; token not seeded"
        ),
        Err(err) => tracing::error!(error = %err, "bootstrap token seeding failed"),
    }
}
