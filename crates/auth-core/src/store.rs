//! In-memory credential store backed by durable persistence
//!
//! Reads take a shared lock. Registration holds the write lock across the
//! existence check, the durable write and the in-memory insert, so two
//! registrations of one username cannot both succeed and nothing is acknowledged
//! before it is on disk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::credential::{CredentialRecord, StoredCredential};
use crate::crypto::CredentialHasher;
use crate::error::{AuthError, Result};
use crate::storage::{CredentialBackend, CredentialMap};

/// Demo accounts used when no store has been persisted yet.
///
/// Insecure plaintext entries: meant to be migrated or replaced on first real use.
const DEFAULT_RECORDS: &[(&str, &str)] = &[("leeanne", "password123"), ("admin", "adminpass")];

/// Credential store service object
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
    records: RwLock<CredentialMap>,
    hasher: CredentialHasher,
    /// Whether the current mapping exists only in memory
    unpersisted: AtomicBool,
}

impl CredentialStore {
    /// Load the store, falling back to the built-in demo records when nothing is persisted
    pub async fn load(backend: Arc<dyn CredentialBackend>, hasher: CredentialHasher) -> Result<Self> {
        let (records, unpersisted) = match backend.load().await? {
            Some(records) => {
                info!("Loaded {} credentials from {}", records.len(), backend.describe());
                (records, false)
            }
            None => {
                warn!(
                    "No credential store at {} - using insecure demo accounts",
                    backend.describe()
                );
                (default_records(), true)
            }
        };

        Ok(Self {
            backend,
            records: RwLock::new(records),
            hasher,
            unpersisted: AtomicBool::new(unpersisted),
        })
    }

    /// Look up a username (case-sensitive)
    pub async fn get(&self, username: &str) -> Option<CredentialRecord> {
        let records = self.records.read().await;
        records.get(username).map(|credential| CredentialRecord {
            username: username.to_string(),
            credential: credential.clone(),
        })
    }

    pub async fn contains(&self, username: &str) -> bool {
        self.records.read().await.contains_key(username)
    }

    /// All usernames in store order
    pub async fn usernames(&self) -> Vec<String> {
        self.records.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Register a new user; the password is always stored hashed.
    ///
    /// Returns only after the new mapping has been durably written.
    pub async fn register(&self, username: &str, plaintext_password: &str) -> Result<()> {
        if self.contains(username).await {
            return Err(AuthError::Conflict(username.to_string()));
        }

        // Hash outside the critical section; the check below is authoritative
        let hasher = self.hasher.clone();
        let password = plaintext_password.to_string();
        let stored = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::HashingError(e.to_string()))??;

        let mut records = self.records.write().await;
        if records.contains_key(username) {
            return Err(AuthError::Conflict(username.to_string()));
        }

        let mut candidate = records.clone();
        candidate.insert(username.to_string(), StoredCredential::parse(&stored));
        self.backend.save(&candidate).await?;

        *records = candidate;
        self.unpersisted.store(false, Ordering::SeqCst);

        info!("Registered user {}", username);
        Ok(())
    }

    /// Write the full current mapping to durable storage
    pub async fn persist(&self) -> Result<()> {
        let records = self.records.read().await;
        self.backend.save(&records).await?;
        self.unpersisted.store(false, Ordering::SeqCst);

        debug!("Persisted {} credentials", records.len());
        Ok(())
    }

    /// Persist the mapping if it has never been written (first start)
    pub async fn ensure_persisted(&self) -> Result<bool> {
        if !self.unpersisted.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.persist().await?;
        info!("Created credential store at {}", self.backend.describe());
        Ok(true)
    }

    /// Atomically replace every record; memory changes only after the write succeeds
    pub async fn replace_all(&self, replacement: CredentialMap) -> Result<()> {
        let mut records = self.records.write().await;
        self.backend.save(&replacement).await?;
        *records = replacement;
        self.unpersisted.store(false, Ordering::SeqCst);

        info!("Replaced credential store with {} records", records.len());
        Ok(())
    }

    /// The hasher used for new credentials
    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }
}

fn default_records() -> CredentialMap {
    DEFAULT_RECORDS
        .iter()
        .map(|(username, password)| (username.to_string(), StoredCredential::parse(password)))
        .collect()
}
