//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC strings, so the algorithm and its parameters travel
//! with each hash and can be upgraded on the next successful login.
//! Both operations are CPU-bound by design; the async wrappers run them
//! on the blocking pool so they never stall the request executor.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::AuthError;

// OWASP recommended: m=19456 (19 MiB), t=2, p=1
const MEMORY_KIB: u32 = 19_456;
const ITERATIONS: u32 = 2;
const PARALLELISM: u32 = 1;

/// Well-formed hash of no known password. Verifying against it costs the
/// same as a real check, so unknown emails take as long as wrong
/// passwords.
pub const TIMING_EQUALIZER_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$kniMcetpFWVjAaE6SaWuuw$jqaA/lX+qCond/ocXROTMb4cRCjKS8hacDGPjyIiwJI";

fn hasher() -> Result<Argon2<'static>, AuthError> {
    let params = argon2::Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))
}

/// Verify a plaintext password against an Argon2 PHC-format hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    // Parameters come from the PHC string, not from `Argon2::default()`.
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

/// `true` when `hash` was produced with a different algorithm or cost
/// than [`hash_password`] currently uses.
pub fn needs_rehash(hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return true;
    };
    if parsed.algorithm != argon2::Algorithm::Argon2id.ident() {
        return true;
    }
    match argon2::Params::try_from(&parsed) {
        Ok(params) => {
            params.m_cost() != MEMORY_KIB
                || params.t_cost() != ITERATIONS
                || params.p_cost() != PARALLELISM
        }
        Err(_) => true,
    }
}

/// [`hash_password`] on the blocking thread pool.
pub async fn hash_password_async(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Crypto(format!("hash task failed: {e}")))?
}

/// [`verify_password`] on the blocking thread pool.
pub async fn verify_password_async(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Crypto(format!("verify task failed: {e}")))?
}
