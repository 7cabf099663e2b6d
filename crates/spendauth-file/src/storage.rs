//! Filesystem storage for session records.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, instrument};
use uuid::Uuid;

use spendauth_core::error::StorageError;
use spendauth_core::traits::SessionStorage;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// A [`SessionStorage`] keeping one JSON file per key under a root directory.
///
/// Writes are serialized through an exclusive lock on `<root>/.lock` and land
/// through a rename, so readers never see a half-written record.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `root`. The directory is created lazily.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the path of the record stored under `key`.
    pub fn record_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Self::validate_key(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    /// Keys become file names, so they are restricted to a portable set.
    fn validate_key(key: &str) -> Result<(), StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

        if valid {
            Ok(())
        } else {
            Err(StorageError::InvalidKey {
                key: key.to_string(),
            })
        }
    }

    /// Run `f` while holding the exclusive write lock.
    fn with_lock<T>(
        &self,
        f: impl FnOnce() -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        fs::create_dir_all(&self.root)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        lock_file.lock_exclusive()?;
        let result = f();
        lock_file.unlock()?;

        result
    }
}

impl SessionStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.record_path(key)?;

        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, value), fields(root = %self.root.display()))]
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.record_path(key)?;

        self.with_lock(|| {
            let temp_path = self
                .root
                .join(format!(".{}.{}.tmp", key, Uuid::new_v4().simple()));

            let mut file = OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_data()?;

            // Set restrictive permissions (Unix only)
            #[cfg(unix)]
            {
                let mut perms = file.metadata()?.permissions();
                perms.set_mode(0o600);
                fs::set_permissions(&temp_path, perms)?;
            }

            if let Err(e) = fs::rename(&temp_path, &path) {
                let _ = fs::remove_file(&temp_path);
                return Err(e.into());
            }

            debug!(path = %path.display(), "Saved session record");
            Ok(())
        })
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.record_path(key)?;
        if !self.root.exists() {
            return Ok(());
        }

        self.with_lock(|| match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed session record");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use spendauth_core::{AccessToken, Credential, RefreshToken, SessionStore};
    use tempfile::TempDir;

    #[test]
    fn load_missing_key_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("session"));

        assert_eq!(storage.load("openspending").unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("session"));

        storage.save("openspending", r#"{"token":"a"}"#).unwrap();
        assert_eq!(
            storage.load("openspending").unwrap().as_deref(),
            Some(r#"{"token":"a"}"#)
        );

        storage.save("openspending", r#"{"token":"b"}"#).unwrap();
        assert_eq!(
            storage.load("openspending").unwrap().as_deref(),
            Some(r#"{"token":"b"}"#)
        );
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        storage.save("openspending", "{}").unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn records_are_private() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        storage.save("openspending", "{}").unwrap();

        let path = storage.record_path("openspending").unwrap();
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("session"));

        storage.remove("openspending").unwrap();
        storage.save("openspending", "{}").unwrap();
        storage.remove("openspending").unwrap();
        storage.remove("openspending").unwrap();

        assert_eq!(storage.load("openspending").unwrap(), None);
    }

    #[test]
    fn io_errors_name_the_cause_once() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let storage = FileStorage::new(&blocker);
        assert_eq!(storage.root(), blocker.as_path());

        let err = storage.save("openspending", "{}").unwrap_err();

        assert!(matches!(err, StorageError::Io { .. }));
        let message = err.to_string();
        assert!(message.starts_with("I/O error: "), "{}", message);
        assert_eq!(message.matches("I/O error").count(), 1, "{}", message);
        assert!(!message.contains("IO error"), "{}", message);
    }

    #[test]
    fn rejects_unsafe_keys() {
        let storage = FileStorage::new("/nonexistent");

        for key in ["", "../escape", "a/b", ".hidden", "with space"] {
            let err = storage.load(key).unwrap_err();
            assert!(
                matches!(err, StorageError::InvalidKey { .. }),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn store_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let credential = Credential::new(
            AccessToken::new("eyJhbGciOiJIUzI1NiJ9.e30.sig"),
            Some(RefreshToken::new("r1")),
        );

        let mut first =
            SessionStore::hydrate(Arc::new(FileStorage::new(temp_dir.path()))).unwrap();
        first.login_success(credential.clone()).unwrap();
        drop(first);

        let second =
            SessionStore::hydrate(Arc::new(FileStorage::new(temp_dir.path()))).unwrap();
        assert!(second.is_logged_in());
        assert_eq!(second.current_user(), Some(credential));

        let raw = fs::read_to_string(temp_dir.path().join("openspending.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["refreshToken"], "r1");
    }
}
