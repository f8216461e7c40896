/*
 * Responsibility
 * - Config読み込み → 依存生成 (token store, cleanup worker, user directory) → Router 組み立て
 * - 起動時の一回限りの処理 (bootstrap token の投入)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::middleware;
use crate::repos::{MemoryTokenRepo, TokenStore, ValkeyTokenRepo};
use crate::services::auth::{PasswordAuthenticator, TokenGate, bootstrap, cleanup};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,token_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting token gate in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, config.request_body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_store(config: &Config) -> Result<Arc<dyn TokenStore>> {
    match &config.token_store_url {
        Some(url) => {
            let repo = ValkeyTokenRepo::connect(url, config.token_store_prefix.clone())
                .await
                .context("failed to connect to token store")?;
            Ok(Arc::new(repo))
        }
        None => {
            if config.app_env.is_production() {
                tracing::warn!("TOKEN_STORE_URL is not set; tokens live in process memory");
            }
            Ok(Arc::new(MemoryTokenRepo::new()))
        }
    }
}

async fn build_state(config: &Config) -> Result<AppState> {
    let store = build_store(config).await?;
    tracing::info!(backend = store.backend_name(), "token store ready");

    if config.users.is_empty() {
        tracing::warn!("user directory is empty; every login will fail");
    }
    if config.redirect_policy.is_empty() {
        tracing::warn!("AUTH_REDIRECT_ORIGINS is not set; every login redirect will be refused");
    }

    if let Some(seed) = &config.bootstrap {
        bootstrap::seed_and_log(store.as_ref(), &config.users, seed).await;
    }

    // The worker lives as long as the gate holds the queue.
    let (cleanup_queue, _worker) = cleanup::spawn(store.clone());
    let gate = Arc::new(TokenGate::new(store, cleanup_queue));
    let authenticator = Arc::new(PasswordAuthenticator::new(config.users.clone()));

    let redirect_policy = Arc::new(config.redirect_policy.clone());

    Ok(AppState::new(gate, authenticator, redirect_policy))
}

pub fn build_router(state: AppState, body_limit: usize) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(state.clone()))
        .with_state(state);

    middleware::http::apply(router, body_limit)
}
