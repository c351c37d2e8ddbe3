//! Password hashing (Argon2id, PHC string format).

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::RngCore;

use tillbook_core::{LedgerError, LedgerResult};

const SALT_LEN: usize = 16;

/// Hash a raw credential for storage. The input itself is never kept.
pub fn hash_password(password: &str) -> LedgerResult<String> {
    if password.is_empty() {
        return Err(LedgerError::validation("password is required"));
    }

    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| LedgerError::internal(format!("could not encode salt: {e}")))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| LedgerError::internal(format!("could not hash password: {e}")))?;

    Ok(hash.to_string())
}

/// Check a raw credential against a stored hash.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
