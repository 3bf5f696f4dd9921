//! Authentication service orchestration
//!
//! Owns the credential store and the token issuer and exposes the operations
//! the transport layer calls: login, register, user listing and token lookup.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::credential::{verify, StoredCredential, Verification};
use crate::error::{AuthError, Result};
use crate::session::{IdentityToken, TokenIssuer};
use crate::settings::Settings;
use crate::storage::StoreLock;
use crate::store::CredentialStore;

/// Main service struct
pub struct AuthService {
    store: CredentialStore,
    issuer: TokenIssuer,
    admin_username: String,
    /// Verified against when the username is unknown, so both failure paths cost the same
    dummy: StoredCredential,
    /// Held for the lifetime of the service
    _lock: Option<StoreLock>,
}

impl AuthService {
    /// Open the configured store file and take its lock
    pub async fn open(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let lock = StoreLock::acquire(&settings.store_path)?;
        let store = CredentialStore::load(Arc::new(settings.storage()), settings.hasher()).await?;
        store.ensure_persisted().await?;

        let mut service = Self::new(store, settings.token_issuer()?, &settings.admin_username).await?;
        service._lock = Some(lock);

        info!(
            "Auth service ready: {} users in {:?}",
            service.store.len().await,
            settings.store_path
        );
        Ok(service)
    }

    /// Build a service from parts. No store lock is taken.
    pub async fn new(
        store: CredentialStore,
        issuer: TokenIssuer,
        admin_username: impl Into<String>,
    ) -> Result<Self> {
        let hasher = store.hasher().clone();
        let dummy = tokio::task::spawn_blocking(move || hasher.hash("timing-equaliser"))
            .await
            .map_err(|e| AuthError::HashingError(e.to_string()))??;

        Ok(Self {
            store,
            issuer,
            admin_username: admin_username.into(),
            dummy: StoredCredential::parse(&dummy),
            _lock: None,
        })
    }

    /// Check a password and issue a token on success.
    ///
    /// Unknown user, wrong password and an unparseable stored value all return
    /// `Unauthorized`.
    pub async fn login(&self, username: &str, password: &str) -> Result<IdentityToken> {
        let record = self.store.get(username).await;
        let known = record.is_some();
        let credential = record
            .map(|r| r.credential)
            .unwrap_or_else(|| self.dummy.clone());

        let candidate = password.to_string();
        let outcome = tokio::task::spawn_blocking(move || verify(&credential, &candidate))
            .await
            .map_err(|e| AuthError::HashingError(e.to_string()))?;

        match (known, outcome) {
            (true, Verification::Match) => {
                let token = self.issuer.issue(username)?;
                info!("Login succeeded for {}", username);
                Ok(token)
            }
            (true, Verification::Malformed) => {
                warn!("Stored value for {} could not be parsed - rejecting login", username);
                Err(AuthError::Unauthorized)
            }
            (true, Verification::NoMatch) => {
                debug!("Wrong password for {}", username);
                Err(AuthError::Unauthorized)
            }
            (false, _) => {
                debug!("Login for unknown user {}", username);
                Err(AuthError::Unauthorized)
            }
        }
    }

    /// Create a user; the password is stored hashed
    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        self.store.register(username, password).await
    }

    /// All usernames, only for the administrative identity
    pub async fn list_usernames(&self, caller: &str) -> Result<Vec<String>> {
        if caller != self.admin_username {
            warn!("User {} attempted to list users", caller);
            return Err(AuthError::Forbidden);
        }
        Ok(self.store.usernames().await)
    }

    /// Resolve a token to the username it was issued to
    pub fn identify(&self, token: &str) -> Result<String> {
        let claims = self.issuer.validate(token)?;
        debug!("Token {} resolved to {}", claims.jti, claims.sub);
        Ok(claims.sub)
    }
}
