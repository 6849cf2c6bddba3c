//! Password hashing and verification with Argon2.

use crate::errors::{Error, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{debug, error, instrument};

/// Hashes a plain-text password into an Argon2 PHC string.
///
/// # Errors
/// Returns [`Error::Validation`] for an empty password and
/// [`Error::PasswordHash`] if the hasher fails.
#[instrument(skip(password))]
pub fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(Error::Validation {
            message: "Password cannot be empty".to_string(),
        });
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "Argon2 password hashing failed.");
            Error::PasswordHash {
                message: e.to_string(),
            }
        })
}

/// Verifies a plain-text password against a stored hash.
///
/// Returns `Ok(false)` on a mismatch; an unparsable stored hash is an error.
///
/// # Errors
/// Returns [`Error::PasswordHash`] if the stored hash is malformed or
/// verification fails for a reason other than a mismatch.
#[instrument(skip_all)]
pub fn verify_password(stored_hash: &str, provided: &str) -> Result<bool> {
    if provided.is_empty() {
        return Ok(false);
    }

    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "Failed to parse stored password hash.");
        Error::PasswordHash {
            message: e.to_string(),
        }
    })?;

    match Argon2::default().verify_password(provided.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => {
            debug!("Password mismatch.");
            Ok(false)
        }
        Err(e) => Err(Error::PasswordHash {
            message: e.to_string(),
        }),
    }
}
