//! # auth-core
//!
//! Credential verification and storage for the auth service:
//! - stored value detection (plaintext vs hashed) and constant-time verification
//! - Argon2id and Werkzeug-compatible PBKDF2 password hashing
//! - JSON credential store with atomic writes and an exclusive lock file
//! - one-time plaintext-to-hash migration with a backup snapshot
//! - HMAC-signed identity tokens

pub mod credential;
pub mod crypto;
pub mod error;
pub mod migration;
pub mod service;
pub mod session;
pub mod settings;
pub mod storage;
pub mod store;

pub use credential::{detect, verify, verify_stored_value, Encoding, StoredCredential, Verification};
pub use crypto::{CredentialHasher, HashScheme, SecretString, SigningKey};
pub use error::{AuthError, ErrorKind, Result};
pub use migration::{Migration, MigrationReport, TransformSummary};
pub use service::AuthService;
pub use session::{Claims, IdentityToken, TokenIssuer};
pub use settings::Settings;
pub use storage::{CredentialBackend, CredentialMap, JsonFileStorage, StoreLock};
pub use store::CredentialStore;
