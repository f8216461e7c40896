use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::error::AppError;
use crate::services::auth::{ClientCredentials, decode_client_credentials};
use crate::state::AppState;

/// Optional HTTP Basic credentials.
///
/// - no `Authorization` header, or another scheme -> `BasicAuth(None)`
/// - `Basic` scheme with a malformed payload     -> 400
pub struct BasicAuth(pub Option<ClientCredentials>);

impl FromRequestParts<AppState> for BasicAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(BasicAuth(None));
        };

        let is_basic = value
            .get(.."basic ".len())
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("basic "));
        if !is_basic {
            return Ok(BasicAuth(None));
        }

        let creds = decode_client_credentials(value).map_err(|err| {
            tracing::warn!(error = %err, "malformed basic credentials");
            AppError::from(err)
        })?;

        Ok(BasicAuth(Some(creds)))
    }
}
