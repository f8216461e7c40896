use serde::Deserialize;

/// Form body for `POST /login`.
///
/// Credentials come from the `Authorization: Basic` header when present;
/// otherwise from `username`/`password`.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Where to send the user agent after a successful login.
    pub redirect_uri: String,
    /// Opaque client value echoed back on the redirect.
    pub state: Option<String>,
}
