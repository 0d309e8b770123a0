//! Authentication error types.

use numis_core::error::NumisError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is locked for {remaining_minutes} more minutes")]
    AccountLocked { remaining_minutes: i64 },

    #[error("MFA is already enabled")]
    MfaAlreadyEnabled,

    #[error("MFA is not enabled")]
    MfaNotEnabled,

    #[error("no MFA secret provisioned")]
    NoSecretProvisioned,

    #[error("invalid MFA code")]
    MfaInvalidCode,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<AuthError> for NumisError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => NumisError::InvalidCredentials,
            AuthError::AccountLocked { remaining_minutes } => {
                NumisError::AccountLocked { remaining_minutes }
            }
            AuthError::MfaAlreadyEnabled => NumisError::MfaAlreadyEnabled,
            AuthError::MfaNotEnabled => NumisError::MfaNotEnabled,
            AuthError::NoSecretProvisioned => NumisError::NoSecretProvisioned,
            AuthError::MfaInvalidCode => NumisError::InvalidCode,
            AuthError::TokenExpired => NumisError::TokenExpired,
            AuthError::TokenInvalid(_) => NumisError::InvalidToken,
            AuthError::Crypto(msg) => NumisError::Crypto(msg),
            AuthError::Config(message) => NumisError::Validation { message },
        }
    }
}
