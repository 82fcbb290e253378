use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{MemoryStorage, Storage, StorageError};

/// Storage where every operation fails, like a browser with storage disabled.
#[derive(Debug, Clone, Copy)]
pub struct FailingStorage;

impl Storage for FailingStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Disabled)
    }

    fn set_item(&self, key: &str, _value: String) -> Result<(), StorageError> {
        Err(StorageError::QuotaExceeded {
            key: key.to_string(),
        })
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Disabled)
    }
}

/// In-memory storage that counts writes and removals.
#[derive(Debug, Clone, Default)]
pub struct CountingStorage {
    pub inner: MemoryStorage,
    writes: Arc<AtomicUsize>,
    removals: Arc<AtomicUsize>,
}

impl CountingStorage {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

impl Storage for CountingStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_item(key)
    }
}
