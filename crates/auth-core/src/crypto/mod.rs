//! Cryptographic primitives for credential storage and tokens
//!
//! This module provides:
//! - Argon2id digests (default for new credentials)
//! - PBKDF2 digests in the legacy Werkzeug layout
//! - Secure memory handling with zeroize

mod argon2id;
mod hasher;
mod secure_memory;
pub mod werkzeug;

pub use argon2id::{hash_argon2, is_argon2_phc, verify_argon2, Argon2Params};
pub use hasher::{CredentialHasher, HashScheme};
pub use secure_memory::{SecretString, SigningKey};

/// Separates the algorithm tag and parameters in every hashed stored value
pub const HASH_DELIMITER: char = ':';

/// Algorithm tag for Argon2 stored values
pub const ARGON2_TAG: &str = "argon2";

/// Algorithm tag for PBKDF2 stored values
pub const PBKDF2_TAG: &str = "pbkdf2";

/// Algorithm tag written by newer legacy deployments; recognized but not verifiable here
pub const SCRYPT_TAG: &str = "scrypt";
