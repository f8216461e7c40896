/*
 * Responsibility
 * - POST /login
 * - redirect_uri の origin を許可リストで確認 (open redirect 防止)
 * - Basic header または form の username/password を user directory で照合
 * - 成功時は redirect_uri に sub (+ state) を付けて 303 で返す
 */
use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::Redirect,
};

use crate::api::v1::dto::login::LoginForm;
use crate::api::v1::extractors::BasicAuth;
use crate::error::AppError;
use crate::services::auth::build_url;
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    BasicAuth(basic): BasicAuth,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Redirect, AppError> {
    let Form(form) = form.map_err(|e| AppError::bad_request("INVALID_FORM", e.body_text()))?;

    state.redirect_policy.check(&form.redirect_uri)?;

    let (username, password) = match basic {
        Some(creds) => (creds.id, creds.secret),
        None => match (form.username, form.password) {
            (Some(username), Some(password)) => (username, password),
            _ => {
                return Err(AppError::bad_request(
                    "MISSING_CREDENTIALS",
                    "username and password are required",
                ));
            }
        },
    };

    let sub = state.authenticator.authenticate(&username, &password)?;

    let mut options = vec![("sub", sub)];
    if let Some(client_state) = form.state {
        options.push(("state", client_state));
    }
    let location = build_url(&form.redirect_uri, &options, None)?;

    tracing::info!(username = %username, "user logged in");

    Ok(Redirect::to(&location))
}
