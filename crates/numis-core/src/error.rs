//! Error types for the Numis system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NumisError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    /// Wrong email or password. Deliberately does not say which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked. Try again after {remaining_minutes} minutes")]
    AccountLocked { remaining_minutes: i64 },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("MFA is already enabled")]
    MfaAlreadyEnabled,

    #[error("MFA is not enabled")]
    MfaNotEnabled,

    #[error("MFA secret not found, run setup first")]
    NoSecretProvisioned,

    #[error("Invalid TOTP code")]
    InvalidCode,

    #[error("Quantity cannot be negative: current {current}, delta {delta}")]
    NegativeQuantity { current: i64, delta: i64 },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Concurrent modification of {entity} with id {id}")]
    Conflict { entity: String, id: String },

    #[error("Audit write failed: {0}")]
    AuditWriteFailure(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NumisError {
    /// `true` for the errors a caller should treat as "unauthenticated".
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            NumisError::InvalidCredentials | NumisError::InvalidToken | NumisError::TokenExpired
        )
    }
}

pub type NumisResult<T> = Result<T, NumisError>;
