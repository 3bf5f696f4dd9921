//! Exclusive lock file keeping the live service and the migration tool apart

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::json_file::with_suffix;
use crate::error::{AuthError, Result};

/// Suffix of the lock file next to the store
pub const LOCK_SUFFIX: &str = ".lock";

/// Held for as long as a process operates on a store file.
///
/// The lock file is created with `create_new` and removed on drop. A lock left
/// behind by a crashed process has to be removed by the operator.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Take the lock for the given store path
    pub fn acquire(store_path: &Path) -> Result<Self> {
        let path = with_suffix(store_path, LOCK_SUFFIX);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(AuthError::StoreLocked(path));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;

        debug!("Acquired store lock {:?}", path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Released store lock {:?}", self.path),
            Err(e) => warn!("Could not remove store lock {:?}: {}", self.path, e),
        }
    }
}
