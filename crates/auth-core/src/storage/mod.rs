//! Durable persistence for the credential mapping
//!
//! - `JsonFileStorage`: the store file, written atomically
//! - `StoreLock`: exclusive lock file shared by the service and the migration tool

mod json_file;
mod lock;
mod traits;

pub use json_file::{with_suffix, JsonFileStorage, BACKUP_SUFFIX, DEFAULT_IO_TIMEOUT, TEMP_SUFFIX};
pub use lock::{StoreLock, LOCK_SUFFIX};
pub use traits::{CredentialBackend, CredentialMap};
