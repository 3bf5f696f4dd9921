//! One-time migration of plaintext stored values to digests
//!
//! Runs offline against the store file:
//! 1. preflight: the store must exist and no backup may exist yet
//! 2. snapshot: the store is renamed (not copied) to `<store>.bak`
//! 3. transform: plaintext values are hashed, digests pass through unchanged
//! 4. commit: the result is written to a temp file and renamed onto the store
//!
//! The store is read and transformed in memory before the snapshot, so a
//! corrupt store or a hashing failure leaves every file where it was. A failure
//! during commit leaves the backup in place and no live store; `restore` moves
//! the backup back.

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::credential::StoredCredential;
use crate::crypto::CredentialHasher;
use crate::error::{AuthError, Result};
use crate::storage::{CredentialMap, JsonFileStorage, StoreLock};

/// Counts from a transform pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSummary {
    /// Values that were hashed
    pub hashed: usize,
    /// Digests copied unchanged
    pub unchanged: usize,
    /// Empty values left as they were
    pub empty: usize,
}

/// Outcome of a completed migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub summary: TransformSummary,
    pub backup_path: PathBuf,
}

enum Action {
    Keep,
    LeaveEmpty,
    Hash,
}

fn classify(credential: &StoredCredential) -> Action {
    if credential.has_known_algorithm() {
        Action::Keep
    } else if credential.as_str().is_empty() {
        Action::LeaveEmpty
    } else {
        Action::Hash
    }
}

/// Count what `transform` would do without hashing anything
pub fn plan(records: &CredentialMap) -> TransformSummary {
    let mut summary = TransformSummary::default();
    for credential in records.values() {
        match classify(credential) {
            Action::Keep => summary.unchanged += 1,
            Action::LeaveEmpty => summary.empty += 1,
            Action::Hash => summary.hashed += 1,
        }
    }
    summary
}

/// Re-encode every plaintext value. Running it on its own output changes nothing.
pub fn transform(
    records: CredentialMap,
    hasher: &CredentialHasher,
) -> Result<(CredentialMap, TransformSummary)> {
    let mut summary = TransformSummary::default();
    let mut migrated = CredentialMap::with_capacity(records.len());

    for (username, credential) in records {
        let credential = match classify(&credential) {
            Action::Keep => {
                summary.unchanged += 1;
                credential
            }
            Action::LeaveEmpty => {
                // Hashing "" would turn a never-matching entry into an empty password
                warn!("Leaving empty stored value for {} unchanged", username);
                summary.empty += 1;
                credential
            }
            Action::Hash => {
                if matches!(credential, StoredCredential::Malformed(_)) {
                    warn!(
                        "Stored value for {} has no known algorithm tag - hashing it as plaintext",
                        username
                    );
                }
                summary.hashed += 1;
                StoredCredential::parse(&hasher.hash(credential.as_str())?)
            }
        };
        migrated.insert(username, credential);
    }

    Ok((migrated, summary))
}

/// Migration of one store file
pub struct Migration {
    storage: JsonFileStorage,
    hasher: CredentialHasher,
}

impl Migration {
    pub fn new(storage: JsonFileStorage, hasher: CredentialHasher) -> Self {
        Self { storage, hasher }
    }

    /// Take the store lock. A missing directory means the file named by
    /// `missing` cannot exist either.
    fn lock(&self, missing: PathBuf) -> Result<StoreLock> {
        match StoreLock::acquire(self.storage.path()) {
            Err(AuthError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AuthError::NotFound(missing))
            }
            other => other,
        }
    }

    /// Run the migration. Terminal on the first failure; nothing is retried.
    pub async fn run(&self) -> Result<MigrationReport> {
        let _lock = self.lock(self.storage.path().to_path_buf())?;
        let backup_path = self.storage.backup_path();

        // Preflight
        if !self.storage.exists().await? {
            return Err(AuthError::NotFound(self.storage.path().to_path_buf()));
        }
        if self.storage.backup_exists().await? {
            return Err(AuthError::BackupExists(backup_path));
        }
        let records = self.storage.read().await?;
        info!("Migrating {} records in {:?}", records.len(), self.storage.path());

        let hasher = self.hasher.clone();
        let (migrated, summary) = tokio::task::spawn_blocking(move || transform(records, &hasher))
            .await
            .map_err(|e| AuthError::HashingError(e.to_string()))??;

        // Snapshot
        self.storage.rename_to_backup().await?;
        info!("Original store saved as {:?}", backup_path);

        // Commit
        if let Err(e) = self.storage.write(&migrated).await {
            error!(
                "Commit failed, live store {:?} is absent and the original is at {:?}: {}",
                self.storage.path(),
                backup_path,
                e
            );
            return Err(e);
        }

        info!(
            "Migration complete: {} hashed, {} already hashed, {} empty",
            summary.hashed, summary.unchanged, summary.empty
        );
        Ok(MigrationReport {
            summary,
            backup_path,
        })
    }

    /// Move the backup back onto the live path after an interrupted migration
    pub async fn restore(&self) -> Result<PathBuf> {
        let backup_path = self.storage.backup_path();
        let _lock = self.lock(backup_path.clone())?;

        if self.storage.exists().await? {
            return Err(AuthError::RestoreRefused(format!(
                "{} exists; remove or rename it first",
                self.storage.path().display()
            )));
        }
        if !self.storage.backup_exists().await? {
            return Err(AuthError::NotFound(backup_path));
        }

        self.storage.rename_from_backup().await?;
        info!("Restored {:?} from {:?}", self.storage.path(), backup_path);
        Ok(self.storage.path().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{verify_stored_value, Encoding};
    use crate::crypto::HashScheme;
    use crate::storage::{with_suffix, BACKUP_SUFFIX};
    use tempfile::TempDir;

    const LEGACY_PBKDF2: &str = "pbkdf2:sha256:1000$abcdefgh12345678$cc78ef12e984a21cb59f2d21dbb2062b7a681dfa2c934544f9fc9fbd8cbf802e";

    fn hasher() -> CredentialHasher {
        CredentialHasher::for_tests(HashScheme::Argon2)
    }

    fn setup(contents: &str) -> (TempDir, Migration, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("users.json");
        std::fs::write(&path, contents).unwrap();
        let migration = Migration::new(JsonFileStorage::new(&path), hasher());
        (temp_dir, migration, path)
    }

    fn map(pairs: &[(&str, &str)]) -> CredentialMap {
        pairs
            .iter()
            .map(|(u, p)| (u.to_string(), StoredCredential::parse(p)))
            .collect()
    }

    #[test]
    fn test_transform_hashes_plaintext_only() {
        let input = map(&[
            ("alice", "s3cret"),
            ("bob", LEGACY_PBKDF2),
            ("carol", "scrypt:32768:8:1$salt$abcd"),
        ]);

        let (out, summary) = transform(input, &hasher()).unwrap();

        assert_eq!(
            summary,
            TransformSummary {
                hashed: 1,
                unchanged: 2,
                empty: 0
            }
        );
        assert_eq!(out["alice"].encoding(), Encoding::Hashed);
        assert!(verify_stored_value(out["alice"].as_str(), "s3cret"));
        assert_eq!(out["bob"].as_str(), LEGACY_PBKDF2);
        assert_eq!(out["carol"].as_str(), "scrypt:32768:8:1$salt$abcd");
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let input = map(&[("alice", "s3cret"), ("bob", LEGACY_PBKDF2), ("x", "a:b")]);

        let (once, _) = transform(input, &hasher()).unwrap();
        let (twice, summary) = transform(once.clone(), &hasher()).unwrap();

        assert_eq!(once, twice);
        assert_eq!(summary.hashed, 0);
        assert_eq!(summary.unchanged, 3);
    }

    #[test]
    fn test_untagged_colon_value_is_hashed() {
        let (out, summary) = transform(map(&[("x", "correct:horse")]), &hasher()).unwrap();

        assert_eq!(summary.hashed, 1);
        assert!(verify_stored_value(out["x"].as_str(), "correct:horse"));
    }

    #[test]
    fn test_empty_value_left_alone() {
        let (out, summary) = transform(map(&[("ghost", "")]), &hasher()).unwrap();

        assert_eq!(summary.empty, 1);
        assert_eq!(out["ghost"].as_str(), "");
        assert!(!verify_stored_value(out["ghost"].as_str(), ""));
    }

    #[test]
    fn test_plan_counts_without_hashing() {
        let input = map(&[
            ("alice", "s3cret"),
            ("bob", LEGACY_PBKDF2),
            ("ghost", ""),
            ("x", "a:b"),
        ]);

        let counted = plan(&input);
        let (_, summary) = transform(input, &hasher()).unwrap();
        assert_eq!(counted, summary);
        assert_eq!(counted.hashed, 2);
    }

    #[test]
    fn test_transform_refuses_unreadable_pbkdf2_cost() {
        let hasher = CredentialHasher::new(HashScheme::Pbkdf2).with_pbkdf2_iterations(0);

        let result = transform(map(&[("alice", "s3cret")]), &hasher);
        assert!(matches!(result, Err(AuthError::HashingError(_))));
    }

    #[tokio::test]
    async fn test_hashing_failure_moves_nothing() {
        let original = r#"{"alice": "s3cret"}"#;
        let (temp_dir, _, path) = setup(original);
        let migration = Migration::new(
            JsonFileStorage::new(&path),
            CredentialHasher::new(HashScheme::Pbkdf2).with_pbkdf2_iterations(0),
        );

        assert!(matches!(
            migration.run().await,
            Err(AuthError::HashingError(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        assert!(!temp_dir.path().join("users.json.bak").exists());
    }

    #[tokio::test]
    async fn test_migrates_store_and_keeps_backup() {
        let original = r#"{"alice": "s3cret"}"#;
        let (temp_dir, migration, path) = setup(original);

        assert!(verify_stored_value("s3cret", "s3cret"));
        let report = migration.run().await.unwrap();

        assert_eq!(report.summary.hashed, 1);
        assert_eq!(report.backup_path, temp_dir.path().join("users.json.bak"));
        assert_eq!(std::fs::read_to_string(&report.backup_path).unwrap(), original);

        let migrated = JsonFileStorage::new(&path).read().await.unwrap();
        assert_eq!(migrated["alice"].encoding(), Encoding::Hashed);
        assert!(verify_stored_value(migrated["alice"].as_str(), "s3cret"));
        assert!(!verify_stored_value(migrated["alice"].as_str(), "wrong"));

        assert!(!temp_dir.path().join("users.json.tmp").exists());
        assert!(!temp_dir.path().join("users.json.lock").exists());
    }

    #[tokio::test]
    async fn test_aborts_when_backup_exists() {
        let original = r#"{"alice": "s3cret"}"#;
        let (temp_dir, migration, path) = setup(original);
        let backup = temp_dir.path().join("users.json.bak");
        std::fs::write(&backup, "earlier safety copy").unwrap();

        let err = migration.run().await.unwrap_err();

        assert!(matches!(err, AuthError::BackupExists(ref p) if *p == backup));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "earlier safety copy");
    }

    #[tokio::test]
    async fn test_second_run_refuses() {
        let (_temp_dir, migration, _path) = setup(r#"{"alice": "s3cret"}"#);

        migration.run().await.unwrap();
        assert!(matches!(
            migration.run().await,
            Err(AuthError::BackupExists(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_store() {
        let temp_dir = TempDir::new().unwrap();
        let migration = Migration::new(
            JsonFileStorage::new(temp_dir.path().join("users.json")),
            hasher(),
        );

        assert!(matches!(migration.run().await, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope").join("users.json");
        let migration = Migration::new(JsonFileStorage::new(&path), hasher());

        assert!(matches!(
            migration.run().await,
            Err(AuthError::NotFound(ref p)) if *p == path
        ));
        assert!(matches!(
            migration.restore().await,
            Err(AuthError::NotFound(ref p)) if *p == with_suffix(&path, BACKUP_SUFFIX)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_store_moves_nothing() {
        let (temp_dir, migration, path) = setup("{broken");

        assert!(migration.run().await.is_err());
        assert!(path.exists());
        assert!(!temp_dir.path().join("users.json.bak").exists());
    }

    #[tokio::test]
    async fn test_locked_store_is_refused() {
        let (_temp_dir, migration, path) = setup(r#"{"alice": "s3cret"}"#);
        let _held = StoreLock::acquire(&path).unwrap();

        assert!(matches!(
            migration.run().await,
            Err(AuthError::StoreLocked(_))
        ));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_restore_after_interrupted_commit() {
        let original = r#"{"alice": "s3cret"}"#;
        let (temp_dir, migration, path) = setup(original);
        // Simulate a crash between snapshot and commit
        std::fs::rename(&path, temp_dir.path().join("users.json.bak")).unwrap();

        let restored = migration.restore().await.unwrap();

        assert_eq!(restored, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        assert!(!temp_dir.path().join("users.json.bak").exists());
    }

    #[tokio::test]
    async fn test_restore_refuses_to_clobber_live_store() {
        let (temp_dir, migration, _path) = setup(r#"{"alice": "s3cret"}"#);
        std::fs::write(temp_dir.path().join("users.json.bak"), "{}").unwrap();

        assert!(matches!(
            migration.restore().await,
            Err(AuthError::RestoreRefused(_))
        ));
    }
}
