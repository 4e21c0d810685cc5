//! Storage trait definitions.

use crate::StorageResult;

/// Durable client-side key/value storage.
///
/// Values survive process restarts for file-backed implementations.
/// Reads and writes are synchronous.
pub trait DurableStorage: Send + Sync {
    /// Store a value under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve the value for `key`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete `key`. Returns whether a value was present.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
