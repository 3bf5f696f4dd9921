//! Stored credential type definitions

use serde::{Deserialize, Serialize};

use super::detector::{detect, Encoding};
use crate::crypto::werkzeug::{iterations_in_range, Pbkdf2Hash};
use crate::crypto::{is_argon2_phc, ARGON2_TAG, HASH_DELIMITER, PBKDF2_TAG, SCRYPT_TAG};

/// A stored credential value, classified once when it is read.
///
/// Serializes back to exactly the string it was parsed from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StoredCredential {
    /// Legacy plaintext password
    Plaintext(String),
    /// Self-describing hash digest
    Hashed(PasswordDigest),
    /// Carries the hash delimiter but does not parse; never verifies
    Malformed(String),
}

impl StoredCredential {
    /// Classify and parse a raw stored value
    pub fn parse(raw: &str) -> Self {
        match detect(raw) {
            Encoding::Plaintext => Self::Plaintext(raw.to_string()),
            Encoding::Hashed => match PasswordDigest::parse(raw) {
                Some(digest) => Self::Hashed(digest),
                None => Self::Malformed(raw.to_string()),
            },
        }
    }

    /// Encoding as seen by the detector
    pub fn encoding(&self) -> Encoding {
        match self {
            Self::Plaintext(_) => Encoding::Plaintext,
            Self::Hashed(_) | Self::Malformed(_) => Encoding::Hashed,
        }
    }

    /// The raw stored value
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plaintext(value) | Self::Malformed(value) => value,
            Self::Hashed(digest) => &digest.encoded,
        }
    }

    /// Algorithm tag preceding the first delimiter, if any
    pub fn algorithm_tag(&self) -> Option<&str> {
        match self {
            Self::Plaintext(_) => None,
            Self::Hashed(_) | Self::Malformed(_) => {
                self.as_str().split_once(HASH_DELIMITER).map(|(tag, _)| tag)
            }
        }
    }

    /// Whether this value starts with the tag of a known digest scheme.
    ///
    /// Such values are never re-hashed, even when this build cannot verify them.
    pub fn has_known_algorithm(&self) -> bool {
        matches!(
            self.algorithm_tag(),
            Some(PBKDF2_TAG) | Some(ARGON2_TAG) | Some(SCRYPT_TAG)
        )
    }
}

impl From<String> for StoredCredential {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<StoredCredential> for String {
    fn from(credential: StoredCredential) -> Self {
        match credential {
            StoredCredential::Plaintext(value) | StoredCredential::Malformed(value) => value,
            StoredCredential::Hashed(digest) => digest.encoded,
        }
    }
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plaintext(_) => f.write_str("Plaintext([REDACTED])"),
            Self::Hashed(digest) => f.debug_tuple("Hashed").field(digest).finish(),
            Self::Malformed(_) => f.write_str("Malformed([REDACTED])"),
        }
    }
}

/// A parsed hash digest together with its encoded form
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    encoded: String,
    scheme: DigestScheme,
}

/// Algorithm and parameters embedded in a digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestScheme {
    Pbkdf2 {
        hash: Pbkdf2Hash,
        iterations: u32,
        salt: String,
        digest: Vec<u8>,
    },
    Argon2 {
        phc: String,
    },
}

impl PasswordDigest {
    /// Parse `pbkdf2:<hash>:<iterations>$<salt>$<hex>` or `argon2:<phc>`
    pub fn parse(raw: &str) -> Option<Self> {
        let (tag, rest) = raw.split_once(HASH_DELIMITER)?;

        let scheme = match tag {
            PBKDF2_TAG => parse_pbkdf2(rest)?,
            ARGON2_TAG if is_argon2_phc(rest) => DigestScheme::Argon2 {
                phc: rest.to_string(),
            },
            _ => return None,
        };

        Some(Self {
            encoded: raw.to_string(),
            scheme,
        })
    }

    pub fn scheme(&self) -> &DigestScheme {
        &self.scheme
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let algorithm = match &self.scheme {
            DigestScheme::Pbkdf2 { hash, iterations, .. } => {
                format!("pbkdf2-{} ({} rounds)", hash.name(), iterations)
            }
            DigestScheme::Argon2 { .. } => "argon2".to_string(),
        };
        f.debug_struct("PasswordDigest")
            .field("algorithm", &algorithm)
            .finish()
    }
}

fn parse_pbkdf2(rest: &str) -> Option<DigestScheme> {
    let mut parts = rest.splitn(3, '$');
    let method = parts.next()?;
    let salt = parts.next()?;
    let digest_hex = parts.next()?;

    let (hash_name, iterations) = method.split_once(HASH_DELIMITER)?;
    let hash = Pbkdf2Hash::from_name(hash_name)?;
    let iterations: u32 = iterations.parse().ok()?;
    if !iterations_in_range(iterations) {
        return None;
    }

    let digest = hex::decode(digest_hex).ok()?;
    if digest.len() != hash.output_len() {
        return None;
    }

    Some(DigestScheme::Pbkdf2 {
        hash,
        iterations,
        salt: salt.to_string(),
        digest,
    })
}

/// One username and its stored value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub username: String,
    pub credential: StoredCredential,
}
