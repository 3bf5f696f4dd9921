//! Password verification against either stored encoding

use subtle::ConstantTimeEq;

use super::types::{DigestScheme, PasswordDigest, StoredCredential};
use crate::crypto::verify_argon2;
use crate::crypto::werkzeug::derive;

/// Outcome of checking a candidate password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Match,
    NoMatch,
    /// The stored value looks hashed but cannot be used
    Malformed,
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Match)
    }
}

/// Check a candidate against a stored credential. Never fails.
pub fn verify(stored: &StoredCredential, candidate: &str) -> Verification {
    match stored {
        StoredCredential::Plaintext(value) => {
            // An empty stored value never matches, not even an empty candidate
            if !value.is_empty() && bool::from(value.as_bytes().ct_eq(candidate.as_bytes())) {
                Verification::Match
            } else {
                Verification::NoMatch
            }
        }
        StoredCredential::Hashed(digest) => verify_digest(digest, candidate),
        StoredCredential::Malformed(_) => Verification::Malformed,
    }
}

fn verify_digest(digest: &PasswordDigest, candidate: &str) -> Verification {
    match digest.scheme() {
        DigestScheme::Pbkdf2 {
            hash,
            iterations,
            salt,
            digest: expected,
        } => {
            let computed = derive(*hash, candidate, salt, *iterations);
            if bool::from(computed.ct_eq(expected)) {
                Verification::Match
            } else {
                Verification::NoMatch
            }
        }
        DigestScheme::Argon2 { phc } => match verify_argon2(phc, candidate) {
            Some(true) => Verification::Match,
            Some(false) => Verification::NoMatch,
            None => Verification::Malformed,
        },
    }
}

/// Boolean form over a raw stored value: `true` only on a match
pub fn verify_stored_value(stored_value: &str, candidate: &str) -> bool {
    verify(&StoredCredential::parse(stored_value), candidate).is_match()
}
