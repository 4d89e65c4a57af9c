//! Password hashing and verification for faculty credentials.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use subtle::ConstantTimeEq;

use crate::error::{AppError, AppResult};

const ARGON2_PREFIX: &str = "$argon2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Salted PHC string.
    Argon2id,
    /// Unsalted SHA-256 hex, the format older workspaces were written with.
    Sha256,
}

/// SHA-256 of the UTF-8 password, as 64 lowercase hex characters.
pub fn digest(password: &str) -> String {
    let out = Sha256::digest(password.as_bytes());
    out.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn hash_password(password: &str, scheme: PasswordScheme) -> AppResult<String> {
    match scheme {
        PasswordScheme::Sha256 => Ok(digest(password)),
        PasswordScheme::Argon2id => {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(|e| AppError::PasswordHash(e.to_string()))
        }
    }
}

/// Stand-in stored hash for usernames that do not exist, built once per
/// scheme so that rejecting an unknown user costs one full verification.
pub fn dummy_hash(scheme: PasswordScheme) -> &'static str {
    static ARGON2: OnceLock<String> = OnceLock::new();
    static SHA256: OnceLock<String> = OnceLock::new();
    match scheme {
        PasswordScheme::Sha256 => SHA256.get_or_init(|| digest("")),
        PasswordScheme::Argon2id => ARGON2.get_or_init(|| {
            hash_password("", PasswordScheme::Argon2id).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "dummy argon2 hash unavailable; using digest");
                digest("")
            })
        }),
    }
}

#[cfg(test)]
thread_local! {
    pub static VERIFY_CALLS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Checks `password` against a stored hash of either scheme.
///
/// A stored value that is neither a PHC string nor a 64-char hex digest
/// never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    #[cfg(test)]
    VERIFY_CALLS.with(|c| c.set(c.get() + 1));
    if stored.starts_with(ARGON2_PREFIX) {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        return Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();
    }
    if stored.len() != 64 {
        return false;
    }
    let candidate = digest(password);
    candidate
        .as_bytes()
        .ct_eq(stored.to_ascii_lowercase().as_bytes())
        .into()
}
