//! Service settings
//!
//! Read from an optional camelCase JSON file; every field has a default so a
//! partial file (or none at all) is valid. The binaries apply CLI/env overrides
//! on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::crypto::{werkzeug, Argon2Params, CredentialHasher, HashScheme, SigningKey};
use crate::error::{AuthError, Result};
use crate::session::TokenIssuer;
use crate::storage::JsonFileStorage;

/// Service configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Credential store file
    pub store_path: PathBuf,
    /// HTTP port
    pub port: u16,
    /// HMAC key for identity tokens
    pub token_secret: String,
    /// Identity token lifetime in seconds
    pub token_ttl_secs: u64,
    /// The only identity allowed to list users
    pub admin_username: String,
    /// Scheme for newly written digests
    pub hash_scheme: HashScheme,
    /// Argon2id cost for new digests
    pub argon2: Argon2Params,
    /// PBKDF2 rounds for new digests
    pub pbkdf2_iterations: u32,
    /// Bound on each store file operation, in milliseconds
    pub io_timeout_ms: u64,
}

impl Settings {
    /// Token secret used when none is configured. Not for production.
    pub const DEV_TOKEN_SECRET: &'static str = "dev-secret-change-me";

    /// Create default settings
    pub fn new() -> Self {
        Self {
            store_path: PathBuf::from("users.json"),
            port: 5000,
            token_secret: Self::DEV_TOKEN_SECRET.to_string(),
            token_ttl_secs: TokenIssuer::DEFAULT_TTL_SECS,
            admin_username: "admin".to_string(),
            hash_scheme: HashScheme::default(),
            argon2: Argon2Params::default(),
            pbkdf2_iterations: werkzeug::DEFAULT_ITERATIONS,
            io_timeout_ms: 5000,
        }
    }

    /// Load settings from a JSON file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| AuthError::ConfigError(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.token_secret.is_empty() {
            return Err(AuthError::ConfigError("tokenSecret must not be empty".into()));
        }
        if self.admin_username.is_empty() {
            return Err(AuthError::ConfigError("adminUsername must not be empty".into()));
        }
        if self.token_ttl_secs == 0 {
            return Err(AuthError::ConfigError("tokenTtlSecs must be positive".into()));
        }
        if !werkzeug::iterations_in_range(self.pbkdf2_iterations) {
            return Err(AuthError::ConfigError(format!(
                "pbkdf2Iterations must be between 1 and {}",
                werkzeug::MAX_ITERATIONS
            )));
        }
        if self.io_timeout_ms == 0 {
            return Err(AuthError::ConfigError("ioTimeoutMs must be positive".into()));
        }
        Ok(())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.token_secret == Self::DEV_TOKEN_SECRET
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Hasher for new credentials
    pub fn hasher(&self) -> CredentialHasher {
        CredentialHasher::new(self.hash_scheme)
            .with_argon2_params(self.argon2)
            .with_pbkdf2_iterations(self.pbkdf2_iterations)
    }

    /// Store file backend
    pub fn storage(&self) -> JsonFileStorage {
        JsonFileStorage::new(&self.store_path).with_timeout(self.io_timeout())
    }

    /// Token issuer keyed with the configured secret
    pub fn token_issuer(&self) -> Result<TokenIssuer> {
        let key = SigningKey::from_secret(&self.token_secret)
            .ok_or_else(|| AuthError::ConfigError("tokenSecret must not be empty".into()))?;
        Ok(TokenIssuer::new(key, Some(self.token_ttl_secs)))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("store_path", &self.store_path)
            .field("port", &self.port)
            .field("token_secret", &"[REDACTED]")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("admin_username", &self.admin_username)
            .field("hash_scheme", &self.hash_scheme)
            .field("argon2", &self.argon2)
            .field("pbkdf2_iterations", &self.pbkdf2_iterations)
            .field("io_timeout_ms", &self.io_timeout_ms)
            .finish()
    }
}
