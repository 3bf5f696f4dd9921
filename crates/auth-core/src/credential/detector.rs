//! Stored value encoding detection

use crate::crypto::HASH_DELIMITER;

/// Encoding of a stored credential value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Plaintext,
    Hashed,
}

/// Classify a stored value.
///
/// Every digest this crate writes carries the delimiter, so a value without it
/// can only be a legacy plaintext password.
pub fn detect(stored_value: &str) -> Encoding {
    if stored_value.contains(HASH_DELIMITER) {
        Encoding::Hashed
    } else {
        Encoding::Plaintext
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(detect("password123"), Encoding::Plaintext);
        assert_eq!(detect(""), Encoding::Plaintext);
        assert_eq!(detect("pbkdf2:sha256:600000$abc$def"), Encoding::Hashed);
        assert_eq!(detect("argon2:$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"), Encoding::Hashed);
        assert_eq!(detect("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"), Encoding::Plaintext);
    }
}
