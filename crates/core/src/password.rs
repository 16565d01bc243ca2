//! Room password hashing and the password version stamp

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Hash a room password into an Argon2 PHC string.
///
/// An empty password means "no password" and hashes to an empty string.
pub fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Ok(String::new());
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Check `password` against a stored hash
pub fn verify_password(hashed: &str, password: &str) -> bool {
    if hashed.is_empty() {
        return password.is_empty();
    }

    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored room password hash is malformed");
            false
        }
    }
}

/// Version stamp for a hashed password (CRC-32/IEEE of the hash bytes)
pub fn password_version(hashed: &str) -> u32 {
    crc32fast::hash(hashed.as_bytes())
}
