/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health, /login は公開、/userinfo は token gate の内側
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{health::health, login::login, userinfo::userinfo};
use crate::middleware::auth::access;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        .route("/login", post(login));

    let protected = Router::new().route("/userinfo", get(userinfo).post(userinfo));

    public.merge(access::apply(protected, state))
}
