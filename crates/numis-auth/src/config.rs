//! Authentication configuration.
//!
//! Holds the two process-wide secrets: the token signing key and the
//! symmetric key that encrypts TOTP secrets at rest. Both are supplied
//! once at process start and passed by reference to the services that
//! need them.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::AuthError;

/// Configuration for the authentication service.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 key used to sign and verify access tokens.
    pub jwt_secret: String,
    /// 256-bit AES-GCM key for encrypting TOTP secrets at rest.
    pub mfa_encryption_key: [u8; 32],
    /// Access token lifetime in seconds (default: 604_800 = 7 days).
    pub access_token_lifetime_secs: u64,
    /// Issuer name shown in authenticator apps.
    pub totp_issuer: String,
    /// Minimum password length accepted at registration.
    pub min_password_length: usize,
    /// Consecutive failed attempts before lockout (default: 5).
    pub max_failed_login_attempts: u32,
    /// Lockout cooldown in seconds (default: 900 = 15 min).
    pub lockout_duration_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            mfa_encryption_key: [0u8; 32],
            access_token_lifetime_secs: 604_800,
            totp_issuer: "Numis".into(),
            min_password_length: 8,
            max_failed_login_attempts: 5,
            lockout_duration_secs: 900,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("mfa_encryption_key", &"<redacted>")
            .field("access_token_lifetime_secs", &self.access_token_lifetime_secs)
            .field("totp_issuer", &self.totp_issuer)
            .field("min_password_length", &self.min_password_length)
            .field("max_failed_login_attempts", &self.max_failed_login_attempts)
            .field("lockout_duration_secs", &self.lockout_duration_secs)
            .finish()
    }
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                       | Required | Default   |
    /// |-------------------------------|----------|-----------|
    /// | `NUMIS_JWT_SECRET`            | **yes**  | --        |
    /// | `NUMIS_MFA_ENCRYPTION_KEY`    | **yes**  | --        |
    /// | `NUMIS_ACCESS_TOKEN_TTL_SECS` | no       | `604800`  |
    /// | `NUMIS_TOTP_ISSUER`           | no       | `Numis`   |
    ///
    /// The encryption key is base64 of exactly 32 bytes.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let jwt_secret = lookup("NUMIS_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::Config("NUMIS_JWT_SECRET must be set".into()))?;

        let raw_key = lookup("NUMIS_MFA_ENCRYPTION_KEY")
            .ok_or_else(|| AuthError::Config("NUMIS_MFA_ENCRYPTION_KEY must be set".into()))?;
        let mfa_encryption_key = decode_key(&raw_key)?;

        let access_token_lifetime_secs = match lookup("NUMIS_ACCESS_TOKEN_TTL_SECS") {
            Some(v) => v.parse().map_err(|_| {
                AuthError::Config("NUMIS_ACCESS_TOKEN_TTL_SECS must be a positive integer".into())
            })?,
            None => defaults.access_token_lifetime_secs,
        };

        let totp_issuer = lookup("NUMIS_TOTP_ISSUER").unwrap_or(defaults.totp_issuer);
        if totp_issuer.contains(':') {
            return Err(AuthError::Config(
                "NUMIS_TOTP_ISSUER must not contain ':'".into(),
            ));
        }

        Ok(Self {
            jwt_secret,
            mfa_encryption_key,
            access_token_lifetime_secs,
            totp_issuer,
            ..defaults
        })
    }
}

fn decode_key(raw: &str) -> Result<[u8; 32], AuthError> {
    let bytes = STANDARD
        .decode(raw.trim())
        .map_err(|e| AuthError::Config(format!("NUMIS_MFA_ENCRYPTION_KEY is not base64: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        AuthError::Config(format!(
            "NUMIS_MFA_ENCRYPTION_KEY must decode to 32 bytes, got {}",
            b.len()
        ))
    })
}
