pub mod error;
pub mod memory_token_repo;
pub mod token_repo;
pub mod valkey_token_repo;

pub use error::{StoreError, StoreResult};
pub use memory_token_repo::MemoryTokenRepo;
pub use token_repo::{AccessToken, TokenStore};
pub use valkey_token_repo::ValkeyTokenRepo;
