use std::path::PathBuf;
use std::sync::Arc;

use snafu::{Location, Snafu};
use tracing::instrument;

use crate::model::{PlaybackIdentity, ProgressRecord};

pub use file::FileStorage;
pub use memory::MemoryStorage;

mod file;
mod memory;

#[cfg(test)]
pub(crate) mod testing;

/// Prefix of every persisted progress key.
pub const KEY_PREFIX: &str = "video_progress_";

/// Raw key-value storage local to the browsing context, shared by every session on it.
///
/// Implementations are allowed to fail; [ProgressStore] absorbs those failures.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: String) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// Could not read or write the backing file
    #[snafu(display("storage file `{}` is not accessible: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not encode the stored items
    #[snafu(display("could not encode storage content: {source}"))]
    Encode {
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// The storage refused the write because it is full
    #[snafu(display("storage quota exceeded while writing `{key}`"))]
    QuotaExceeded { key: String },

    /// Storage is turned off for this context
    #[snafu(display("storage is disabled"))]
    Disabled,
}

/// Key under which the progress of `identity` is kept.
pub fn progress_key(identity: &PlaybackIdentity) -> String {
    format!("{KEY_PREFIX}{identity}")
}

/// Persists the last-known playback position per video.
///
/// Every operation is infallible from the caller's point of view: absent, corrupt or
/// unreadable entries read as `0` and failed writes are logged and dropped.
#[derive(Clone)]
pub struct ProgressStore {
    storage: Arc<dyn Storage>,
}

impl ProgressStore {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    pub fn memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    /// Seconds to resume `identity` from, `0` when nothing usable is stored.
    pub fn get(&self, identity: &PlaybackIdentity) -> f64 {
        self.record(identity)
            .map(|record| record.resume_point())
            .unwrap_or(0.0)
    }

    pub fn record(&self, identity: &PlaybackIdentity) -> Option<ProgressRecord> {
        let key = progress_key(identity);

        let raw = match self.storage.get_item(&key) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!(%identity, %error, "could not read saved progress");
                return None;
            }
        };

        match serde_json::from_str::<ProgressRecord>(&raw) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(%identity, %error, "ignoring corrupt saved progress");
                None
            }
        }
    }

    #[instrument(skip(self), level = "trace")]
    pub fn set(&self, identity: &PlaybackIdentity, seconds: f64) {
        let record = ProgressRecord::now(seconds);

        let value = match serde_json::to_string(&record) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%identity, %error, "could not encode progress");
                return;
            }
        };

        if let Err(error) = self.storage.set_item(&progress_key(identity), value) {
            tracing::warn!(%identity, seconds, %error, "could not save progress");
        }
    }

    pub fn clear(&self, identity: &PlaybackIdentity) {
        if let Err(error) = self.storage.remove_item(&progress_key(identity)) {
            tracing::warn!(%identity, %error, "could not clear progress");
        }
    }
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FailingStorage;
    use super::*;
    use crate::model::BackendKind;

    fn video(id: &str) -> PlaybackIdentity {
        PlaybackIdentity::derive(BackendKind::Vimeo, id).unwrap()
    }

    #[test]
    fn resume_round_trip_survives_reload() {
        let storage = MemoryStorage::default();

        ProgressStore::new(storage.clone()).set(&video("1"), 42.0);

        let reloaded = ProgressStore::new(storage);
        assert_eq!(reloaded.get(&video("1")), 42.0);

        reloaded.clear(&video("1"));
        assert_eq!(reloaded.get(&video("1")), 0.0);
    }

    #[test]
    fn videos_do_not_share_progress() {
        let store = ProgressStore::memory();

        store.set(&video("1"), 10.0);

        assert_eq!(store.get(&video("2")), 0.0);
        assert_eq!(store.get(&video("1")), 10.0);
    }

    #[test]
    fn key_layout() {
        assert_eq!(progress_key(&video("76979871")), "video_progress_76979871");
    }

    #[test]
    fn corrupt_entry_reads_as_zero() {
        let storage = MemoryStorage::default();
        storage
            .set_item("video_progress_1", "{not json".to_string())
            .unwrap();

        let store = ProgressStore::new(storage.clone());
        assert_eq!(store.get(&video("1")), 0.0);

        storage
            .set_item("video_progress_1", r#"{"time": "soon"}"#.to_string())
            .unwrap();
        assert_eq!(store.get(&video("1")), 0.0);
    }

    #[test]
    fn record_carries_timestamp() {
        let store = ProgressStore::memory();
        let before = crate::time::epoch_millis();

        store.set(&video("1"), 7.5);

        let record = store.record(&video("1")).unwrap();
        assert_eq!(record.time, 7.5);
        assert!(record.timestamp >= before);
    }

    #[test]
    fn failing_storage_degrades_silently() {
        let store = ProgressStore::new(FailingStorage);

        store.set(&video("1"), 12.0);
        store.clear(&video("1"));

        assert_eq!(store.get(&video("1")), 0.0);
    }
}
