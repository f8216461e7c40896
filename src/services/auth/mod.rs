pub mod basic;
pub mod bootstrap;
pub mod cleanup;
pub mod gate;
pub mod password;
pub mod redirect;

pub use basic::{BasicCredentialsError, ClientCredentials, decode_client_credentials};
pub use cleanup::CleanupQueue;
pub use gate::{GateError, TokenGate};
pub use password::{AuthError, PasswordAuthenticator, UserDirectory};
pub use redirect::{RedirectError, RedirectPolicy, build_url};
