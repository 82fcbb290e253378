use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use snafu::ResultExt;

use super::{EncodeSnafu, IoSnafu, Storage, StorageError};

/// Storage persisted as a flat JSON object in a single file.
///
/// Nothing is cached: every read goes to the file and every change re-reads it before
/// rewriting, so sessions sharing the file only overwrite each other's keys when they write
/// the same key. A change that fails to persist is not visible to later reads.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Opens the storage at `path`. A missing or unreadable file reads as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path).context(IoSnafu { path: &self.path })?;

        match serde_json::from_str(&content) {
            Ok(items) => Ok(items),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "progress storage is corrupt, treating it as empty");
                Ok(HashMap::new())
            }
        }
    }

    fn persist(&self, items: &HashMap<String, String>) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(items).context(EncodeSnafu)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context(IoSnafu { path: parent })?;
        }

        // write-then-rename keeps the previous file intact if the write is cut short
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, content).context(IoSnafu { path: &staging })?;
        fs::rename(&staging, &self.path).context(IoSnafu { path: &self.path })
    }

    fn update(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|poison| poison.into_inner());

        let mut items = self.load()?;
        f(&mut items);
        self.persist(&items)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|poison| poison.into_inner());
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.update(|items| {
            items.insert(key.to_string(), value);
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn items_survive_reopening() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.json");

        let storage = FileStorage::open(&path);
        storage.set_item("video_progress_1", "{}".to_string()).unwrap();
        storage.set_item("video_progress_2", "[]".to_string()).unwrap();
        storage.remove_item("video_progress_2").unwrap();

        let reopened = FileStorage::open(&path);
        assert_eq!(
            reopened.get_item("video_progress_1").unwrap().as_deref(),
            Some("{}")
        );
        assert_eq!(reopened.get_item("video_progress_2").unwrap(), None);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "definitely not json").unwrap();

        let storage = FileStorage::open(&path);
        assert_eq!(storage.get_item("video_progress_1").unwrap(), None);

        storage.set_item("video_progress_1", "{}".to_string()).unwrap();
        assert_eq!(
            FileStorage::open(&path).get_item("video_progress_1").unwrap().as_deref(),
            Some("{}")
        );
    }

    #[test]
    fn unwritable_location_reports_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        // the parent "directory" is a regular file
        let storage = FileStorage::open(blocker.join("progress.json"));
        let result = storage.set_item("video_progress_1", "{}".to_string());

        assert!(matches!(result, Err(StorageError::Io { .. })));
        assert_eq!(
            storage.get_item("video_progress_1").unwrap(),
            None,
            "a failed write must not read back as saved"
        );
    }

    #[test]
    fn sessions_sharing_a_file_keep_each_others_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let first = FileStorage::open(&path);
        let second = FileStorage::open(&path);

        first.set_item("video_progress_a", "10".to_string()).unwrap();
        second.set_item("video_progress_b", "20".to_string()).unwrap();

        let reopened = FileStorage::open(&path);
        assert_eq!(reopened.get_item("video_progress_a").unwrap().as_deref(), Some("10"));
        assert_eq!(reopened.get_item("video_progress_b").unwrap().as_deref(), Some("20"));

        assert_eq!(
            second.get_item("video_progress_a").unwrap().as_deref(),
            Some("10"),
            "writes from another session are visible without reopening"
        );

        second.remove_item("video_progress_b").unwrap();
        assert_eq!(first.get_item("video_progress_a").unwrap().as_deref(), Some("10"));
        assert_eq!(first.get_item("video_progress_b").unwrap(), None);
    }
}
