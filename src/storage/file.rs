use crate::error::app_error::AppError;
use crate::storage::KeyValueStore;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Key/value store kept as a single JSON object on disk.
///
/// Writes go to a sibling temp file that is then renamed over the target, so a crash
/// mid-write leaves the previous contents intact. Other processes sharing the file
/// are not coordinated with: last writer wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, AppError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(AppError::storage(format!("Failed to read {}", self.path.display()), e)),
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|e| AppError::serialization(format!("Failed to parse {}", self.path.display()), e))
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AppError::storage(format!("Failed to create {}", parent.display()), e))?;
        }

        let body = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body).map_err(|e| AppError::storage(format!("Failed to write {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path).map_err(|e| AppError::storage(format!("Failed to replace {}", self.path.display()), e))?;

        debug!(path = %self.path.display(), keys = items.len(), "storage file written");
        Ok(())
    }

    /// Applies `apply` and writes the result back when it reports a change. An unparsable
    /// file is replaced by whatever `apply` leaves in an empty map.
    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut items, replace_corrupt) = match self.read_all() {
            Ok(items) => (items, false),
            Err(e @ AppError::Serialization { .. }) => {
                warn!(error = %e, path = %self.path.display(), "overwriting unreadable storage file");
                (BTreeMap::new(), true)
            }
            Err(e) => return Err(e),
        };

        if apply(&mut items) || replace_corrupt {
            self.write_all(&items)
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.update(|items| items.insert(key.to_string(), value.to_string()).as_deref() != Some(value))
    }

    fn remove_item(&self, key: &str) -> Result<(), AppError> {
        self.update(|items| items.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert!(store.get_item("anything").unwrap().is_none());
        store.remove_item("anything").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn values_survive_a_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::new(&path);
        store.set_item("user", "{\"name\":\"Ada\"}").unwrap();
        store.set_item("login", "1700000000000").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get_item("user").unwrap().as_deref(), Some("{\"name\":\"Ada\"}"));
        assert_eq!(reopened.get_item("login").unwrap().as_deref(), Some("1700000000000"));

        reopened.remove_item("user").unwrap();
        assert!(store.get_item("user").unwrap().is_none());
        assert!(store.get_item("login").unwrap().is_some());
    }

    #[test]
    fn garbage_file_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get_item("user"), Err(AppError::Serialization { .. })));
    }

    #[test]
    fn removing_from_garbage_file_resets_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{truncated").unwrap();

        let store = FileStore::new(&path);
        store.remove_item("user").unwrap();

        assert!(store.get_item("user").unwrap().is_none());
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "{}");
    }

    #[test]
    fn writing_to_garbage_file_replaces_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        store.set_item("login", "1700000000000").unwrap();

        assert_eq!(store.get_item("login").unwrap().as_deref(), Some("1700000000000"));
    }

    #[test]
    fn unchanged_values_do_not_rewrite_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::new(&path);

        store.remove_item("user").unwrap();
        assert!(!path.exists());

        store.set_item("user", "Ada").unwrap();
        store.set_item("user", "Ada").unwrap();
        assert_eq!(store.get_item("user").unwrap().as_deref(), Some("Ada"));
    }
}
