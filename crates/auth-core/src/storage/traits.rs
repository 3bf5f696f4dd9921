//! Storage trait definitions

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::credential::StoredCredential;
use crate::error::Result;

/// Username → stored value, in file order
pub type CredentialMap = IndexMap<String, StoredCredential>;

/// Trait for durable credential backends
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// Read the full mapping, or `None` if nothing has been persisted yet
    async fn load(&self) -> Result<Option<CredentialMap>>;

    /// Durably replace the full mapping
    async fn save(&self, records: &CredentialMap) -> Result<()>;

    /// Human-readable description of where records live
    fn describe(&self) -> String;
}
