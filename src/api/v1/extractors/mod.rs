pub mod auth_ctx;
pub mod basic_auth;

pub use auth_ctx::AuthCtxExtractor;
pub use basic_auth::BasicAuth;
