//! TOTP generation, verification, and AES-256-GCM secret encryption.
//!
//! Secrets are base32 strings (RFC 4648, as authenticator apps expect).
//! At rest they are stored as `base64(nonce || ciphertext || tag)`.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::AuthError;

const DIGITS: usize = 6;
/// Accept one step either side of the current one.
const SKEW: u8 = 1;
const STEP_SECS: u64 = 30;
const NONCE_LEN: usize = 12;

/// Encrypt a TOTP secret with AES-256-GCM.
///
/// Returns `base64(nonce || ciphertext || tag)`.
pub fn encrypt_secret(key: &[u8; 32], plaintext: &[u8]) -> Result<String, AuthError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM encrypt: {e}")))?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(combined))
}

/// Decrypt an AES-256-GCM encrypted TOTP secret.
pub fn decrypt_secret(key: &[u8; 32], encoded: &str) -> Result<Vec<u8>, AuthError> {
    let combined = STANDARD
        .decode(encoded)
        .map_err(|e| AuthError::Crypto(format!("base64 decode: {e}")))?;

    if combined.len() <= NONCE_LEN {
        return Err(AuthError::Crypto("ciphertext too short".into()));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM decrypt: {e}")))
}

/// Encrypt a base32 secret for storage.
pub fn seal_secret(key: &[u8; 32], base32: &str) -> Result<String, AuthError> {
    encrypt_secret(key, base32.as_bytes())
}

/// Decrypt a stored secret back to its normalized base32 form.
pub fn open_secret(key: &[u8; 32], sealed: &str) -> Result<String, AuthError> {
    let bytes = decrypt_secret(key, sealed)?;
    let text = String::from_utf8(bytes)
        .map_err(|_| AuthError::Crypto("decrypted secret is not UTF-8".into()))?;
    Ok(normalize(&text))
}

/// Trim and drop interior spaces. Applied to codes and secrets alike.
pub fn normalize(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Generate a fresh random secret, base32-encoded.
pub fn generate_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

/// What an authenticator app needs to enroll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioning {
    pub secret: String,
    pub account: String,
    pub issuer: String,
    /// `otpauth://totp/...` URI, suitable for a QR code.
    pub uri: String,
}

fn build(base32: &str, issuer: &str, account: &str) -> Result<TOTP, AuthError> {
    let secret_bytes = Secret::Encoded(normalize(base32))
        .to_bytes()
        .map_err(|e| AuthError::Crypto(format!("secret bytes: {e:?}")))?;

    TOTP::new(
        Algorithm::SHA1, // RFC 6238 default
        DIGITS,
        SKEW,
        STEP_SECS,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| AuthError::Crypto(format!("TOTP init: {e}")))
}

/// Build the enrollment descriptor for a base32 secret.
pub fn provisioning(base32: &str, issuer: &str, account: &str) -> Result<Provisioning, AuthError> {
    let totp = build(base32, issuer, account)?;
    Ok(Provisioning {
        secret: normalize(base32),
        account: account.to_string(),
        issuer: issuer.to_string(),
        uri: totp.get_url(),
    })
}

/// Verify `code` against `base32` at the current time, ±1 step.
pub fn verify_code(base32: &str, code: &str, issuer: &str, account: &str) -> Result<bool, AuthError> {
    let totp = build(base32, issuer, account)?;
    totp.check_current(&normalize(code))
        .map_err(|e| AuthError::Crypto(format!("TOTP check: {e}")))
}

/// Verify `code` as if the clock read `unix_secs`, ±1 step.
pub fn verify_code_at(
    base32: &str,
    code: &str,
    unix_secs: u64,
    issuer: &str,
    account: &str,
) -> Result<bool, AuthError> {
    let totp = build(base32, issuer, account)?;
    Ok(totp.check(&normalize(code), unix_secs))
}

/// Code for `base32` at `unix_secs`. Used by enrollment tooling and tests.
pub fn code_at(base32: &str, unix_secs: u64, issuer: &str, account: &str) -> Result<String, AuthError> {
    Ok(build(base32, issuer, account)?.generate(unix_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "Numis";
    const ACCOUNT: &str = "test@test.com";

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = [42u8; 32];
        let secret = generate_secret();
        let sealed = seal_secret(&key, &secret).unwrap();
        assert_ne!(sealed, secret);
        assert_eq!(open_secret(&key, &sealed).unwrap(), secret);
    }

    #[test]
    fn wrong_key_fails_decrypt() {
        let key1 = [42u8; 32];
        let key2 = [99u8; 32];
        let encrypted = encrypt_secret(&key1, b"secret").unwrap();
        assert!(decrypt_secret(&key2, &encrypted).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_decrypt() {
        let key = [42u8; 32];
        let encrypted = encrypt_secret(&key, b"secret").unwrap();
        let mut raw = STANDARD.decode(&encrypted).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert!(decrypt_secret(&key, &STANDARD.encode(raw)).is_err());
        assert!(decrypt_secret(&key, "AAAA").is_err());
    }

    #[test]
    fn provisioning_produces_valid_uri() {
        let secret = generate_secret();
        let p = provisioning(&secret, ISSUER, "alice@example.com").unwrap();
        assert_eq!(p.secret, secret);
        assert!(p.uri.starts_with("otpauth://totp/"));
        assert!(p.uri.contains("Numis"));
        assert!(p.uri.contains("alice"));
        assert!(p.uri.contains(&secret));
    }

    #[test]
    fn normalize_strips_all_whitespace() {
        assert_eq!(normalize(" 123 456\n"), "123456");
        assert_eq!(normalize("JBSW Y3DP"), "JBSWY3DP");
    }

    #[test]
    fn current_code_verifies_with_spaces() {
        let secret = generate_secret();
        let now = 1_700_000_000;
        let code = code_at(&secret, now, ISSUER, ACCOUNT).unwrap();
        let spaced = format!(" {} {} ", &code[..3], &code[3..]);
        assert!(verify_code_at(&secret, &spaced, now, ISSUER, ACCOUNT).unwrap());
    }

    #[test]
    fn one_step_skew_is_tolerated() {
        let secret = generate_secret();
        let now = 1_700_000_010;
        let past = code_at(&secret, now - STEP_SECS, ISSUER, ACCOUNT).unwrap();
        let future = code_at(&secret, now + STEP_SECS, ISSUER, ACCOUNT).unwrap();
        assert!(verify_code_at(&secret, &past, now, ISSUER, ACCOUNT).unwrap());
        assert!(verify_code_at(&secret, &future, now, ISSUER, ACCOUNT).unwrap());
    }

    #[test]
    fn two_steps_away_is_rejected() {
        let secret = generate_secret();
        let now = 1_700_000_010;
        let current = code_at(&secret, now, ISSUER, ACCOUNT).unwrap();
        for offset in [2 * STEP_SECS, 3 * STEP_SECS] {
            let stale = code_at(&secret, now - offset, ISSUER, ACCOUNT).unwrap();
            let early = code_at(&secret, now + offset, ISSUER, ACCOUNT).unwrap();
            // Astronomically unlikely collisions would make the test meaningless.
            if stale != current {
                assert!(!verify_code_at(&secret, &stale, now, ISSUER, ACCOUNT).unwrap());
            }
            if early != current {
                assert!(!verify_code_at(&secret, &early, now, ISSUER, ACCOUNT).unwrap());
            }
        }
    }

    #[test]
    fn verify_code_wrong_code() {
        let secret = generate_secret();
        let code = code_at(&secret, 1_700_000_000, ISSUER, ACCOUNT).unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };
        assert!(!verify_code_at(&secret, wrong, 1_700_000_000, ISSUER, ACCOUNT).unwrap());
    }
}
