//! Durable key/value storage trait.

use std::sync::Arc;

use crate::error::StorageError;

/// Client-local durable storage holding serialized session records by key.
///
/// Calls are synchronous; store commits run to completion without yielding.
pub trait SessionStorage: Send + Sync {
    /// Read the record stored under `key`. A missing key is `Ok(None)`.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the record stored under `key`.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the record stored under `key`. Deleting a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: SessionStorage + ?Sized> SessionStorage for Arc<S> {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).save(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
