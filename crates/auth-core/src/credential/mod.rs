//! Stored credential classification and verification

mod detector;
mod types;
mod verifier;

pub use detector::{detect, Encoding};
pub use types::*;
pub use verifier::{verify, verify_stored_value, Verification};
