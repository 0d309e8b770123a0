//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_admin: bool,
    pub mfa_enabled: bool,
    /// AES-256-GCM encrypted base32 TOTP secret. Never serialized.
    #[serde(skip_serializing, default)]
    pub mfa_secret: Option<String>,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Current lockout counters.
    pub fn lockout_state(&self) -> LockoutState {
        LockoutState {
            failed_attempts: self.failed_login_attempts,
            locked_until: self.locked_until,
        }
    }
}

/// Per-account failed-attempt bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockoutState {
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Identity of the account performing a mutation, captured by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl From<&Account> for Actor {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            is_admin: account.is_admin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub email: String,
    /// Already hashed; the store never sees a raw password.
    pub password_hash: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAccount {
    pub display_name: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub is_admin: Option<bool>,
    pub mfa_enabled: Option<bool>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub mfa_secret: Option<Option<String>>,
}
