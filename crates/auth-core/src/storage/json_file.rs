//! JSON file storage backend
//!
//! The store is a flat JSON object mapping username to stored value. Writes go
//! to a sibling temp file which is synced and renamed over the store, so the
//! store path only ever holds a complete document.

use async_trait::async_trait;
use std::ffi::OsString;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CredentialBackend, CredentialMap};
use crate::error::{AuthError, Result};

/// Suffix of the pre-migration snapshot
pub const BACKUP_SUFFIX: &str = ".bak";

/// Suffix of the staging file used for atomic writes
pub const TEMP_SUFFIX: &str = ".tmp";

/// Default bound on a single file operation
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Append a suffix to the full file name (`users.json` → `users.json.bak`)
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// JSON file holding the credential mapping
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
    io_timeout: Duration,
}

impl JsonFileStorage {
    /// Create a backend for the given store path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Override the bound on each file operation
    pub fn with_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deterministic backup path for this store
    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.path, BACKUP_SUFFIX)
    }

    fn temp_path(&self) -> PathBuf {
        with_suffix(&self.path, TEMP_SUFFIX)
    }

    pub async fn exists(&self) -> Result<bool> {
        let path = self.path.clone();
        self.bounded("stat", tokio::fs::try_exists(path)).await
    }

    pub async fn backup_exists(&self) -> Result<bool> {
        self.bounded("stat", tokio::fs::try_exists(self.backup_path()))
            .await
    }

    /// Read and parse the store file
    pub async fn read(&self) -> Result<CredentialMap> {
        let contents = self
            .bounded("read", tokio::fs::read_to_string(&self.path))
            .await?;

        let records: CredentialMap = serde_json::from_str(&contents).map_err(|e| {
            AuthError::StorageError(format!("{} is not a valid store: {}", self.path.display(), e))
        })?;

        debug!("Read {} records from {:?}", records.len(), self.path);
        Ok(records)
    }

    /// Write the mapping via temp file + rename.
    ///
    /// The whole sequence runs as one blocking task. On timeout the task is told
    /// to stop before the rename; a rename already under way when the timeout
    /// fires may still land, and the caller sees `Timeout` either way.
    pub async fn write(&self, records: &CredentialMap) -> Result<()> {
        let contents = serde_json::to_string_pretty(records)?;
        let path = self.path.clone();
        let temp_path = self.temp_path();
        let abandoned = Arc::new(AtomicBool::new(false));

        let task = tokio::task::spawn_blocking({
            let abandoned = abandoned.clone();
            move || write_atomically(&path, &temp_path, contents.as_bytes(), &abandoned)
        });

        match tokio::time::timeout(self.io_timeout, task).await {
            Ok(joined) => joined.map_err(|e| AuthError::StorageError(e.to_string()))??,
            Err(_) => {
                abandoned.store(true, Ordering::SeqCst);
                return Err(self.timeout_error("write"));
            }
        }

        debug!("Wrote {} records to {:?}", records.len(), self.path);
        Ok(())
    }

    /// Rename the live store onto the backup path
    pub async fn rename_to_backup(&self) -> Result<()> {
        self.bounded("rename", tokio::fs::rename(&self.path, self.backup_path()))
            .await
    }

    /// Rename the backup back onto the live path
    pub async fn rename_from_backup(&self) -> Result<()> {
        self.bounded("rename", tokio::fs::rename(self.backup_path(), &self.path))
            .await
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::io::Result<T>>,
    {
        match tokio::time::timeout(self.io_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(self.timeout_error(operation)),
        }
    }

    fn timeout_error(&self, operation: &str) -> AuthError {
        AuthError::Timeout(format!(
            "{} of {} after {:?}",
            operation,
            self.path.display(),
            self.io_timeout
        ))
    }
}

/// Stage `contents` in `temp_path`, sync it and rename it onto `path`.
/// The temp file is removed on any failure, including abandonment.
fn write_atomically(
    path: &Path,
    temp_path: &Path,
    contents: &[u8],
    abandoned: &AtomicBool,
) -> std::io::Result<()> {
    let staged = (|| {
        let mut file = std::fs::File::create(temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        if abandoned.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "write abandoned after timeout",
            ));
        }
        std::fs::rename(temp_path, path)
    })();

    if staged.is_err() {
        if let Err(e) = std::fs::remove_file(temp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove temp file {:?}: {}", temp_path, e);
            }
        }
    }
    staged
}

#[async_trait]
impl CredentialBackend for JsonFileStorage {
    async fn load(&self) -> Result<Option<CredentialMap>> {
        if !self.exists().await? {
            debug!("No store file at {:?}", self.path);
            return Ok(None);
        }
        self.read().await.map(Some)
    }

    async fn save(&self, records: &CredentialMap) -> Result<()> {
        self.write(records).await
    }

    fn describe(&self) -> String {
        format!("JSON file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StoredCredential;
    use tempfile::TempDir;

    fn records(pairs: &[(&str, &str)]) -> CredentialMap {
        pairs
            .iter()
            .map(|(u, p)| (u.to_string(), StoredCredential::parse(p)))
            .collect()
    }

    #[test]
    fn test_derived_paths() {
        let storage = JsonFileStorage::new("/srv/auth/users.json");
        assert_eq!(storage.backup_path(), PathBuf::from("/srv/auth/users.json.bak"));
        assert_eq!(storage.temp_path(), PathBuf::from("/srv/auth/users.json.tmp"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path().join("users.json"));

        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_round_trip_preserves_order_and_values() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path().join("users.json"));
        let original = records(&[
            ("zed", "plain"),
            ("alice", "pbkdf2:sha256:1000$abcdefgh12345678$cc78ef12e984a21cb59f2d21dbb2062b7a681dfa2c934544f9fc9fbd8cbf802e"),
            ("bob", "odd:value"),
        ]);

        storage.save(&original).await.unwrap();
        let loaded = storage.load().await.unwrap().unwrap();

        assert_eq!(loaded, original);
        assert_eq!(
            loaded.keys().collect::<Vec<_>>(),
            vec!["zed", "alice", "bob"]
        );
        assert!(!storage.temp_path().exists());
    }

    #[tokio::test]
    async fn test_reads_legacy_compact_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("users.json");
        std::fs::write(&path, r#"{"leeanne": "password123", "admin": "adminpass"}"#).unwrap();

        let loaded = JsonFileStorage::new(&path).read().await.unwrap();
        assert_eq!(loaded["admin"].as_str(), "adminpass");
        assert_eq!(loaded.get_index(0).unwrap().0, "leeanne");
    }

    #[tokio::test]
    async fn test_unparseable_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("users.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = JsonFileStorage::new(&path).load().await.unwrap_err();
        assert!(matches!(err, AuthError::StorageError(_)));
    }

    #[tokio::test]
    async fn test_non_string_values_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("users.json");
        std::fs::write(&path, r#"{"alice": 42}"#).unwrap();

        assert!(JsonFileStorage::new(&path).read().await.is_err());
    }

    #[tokio::test]
    async fn test_write_failure_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        // Renaming a file over a directory fails
        let path = temp_dir.path().join("users.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let storage = JsonFileStorage::new(&path);
        assert!(storage.save(&records(&[("a", "b")])).await.is_err());
        assert!(!storage.temp_path().exists());
    }

    #[test]
    fn test_abandoned_write_never_reaches_store() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path().join("users.json"));
        std::fs::write(storage.path(), "{}").unwrap();

        let result = write_atomically(
            storage.path(),
            &storage.temp_path(),
            br#"{"late": "value"}"#,
            &AtomicBool::new(true),
        );

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(storage.path()).unwrap(), "{}");
        assert!(!storage.temp_path().exists());
    }
}
