//! Durable client-side storage for the storefront client.
//!
//! - [`DurableStorage`]: key/value backend trait
//! - [`FileStorage`]: JSON file under `~/.storefront`, survives restarts
//! - [`MemoryStorage`]: process-local backend
//! - [`TokenStore`]: access/refresh credential pair on top of a backend

mod file;
mod keys;
mod memory;
mod tokens;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use tokens::{CredentialPair, TokenStore};
pub use traits::DurableStorage;

use storefront_config_and_utils::Paths;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default file-backed storage at `paths.storage_file()`.
pub fn create_storage(paths: &Paths) -> StorageResult<Box<dyn DurableStorage>> {
    let storage = FileStorage::open(paths.storage_file())?;
    Ok(Box::new(storage))
}

/// Create a TokenStore over the default file-backed storage.
pub fn create_token_store(paths: &Paths) -> StorageResult<TokenStore> {
    let storage = create_storage(paths)?;
    Ok(TokenStore::new(storage))
}
