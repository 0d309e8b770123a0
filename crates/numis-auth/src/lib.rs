//! Numis Auth: password authentication, lockout, access tokens,
//! and MFA (TOTP).

pub mod config;
pub mod error;
pub mod lockout;
pub mod mfa;
pub mod password;
pub mod service;
pub mod token;
pub mod totp;

pub use config::AuthConfig;
pub use error::AuthError;
pub use lockout::{LockStatus, LockoutPolicy};
pub use mfa::MfaService;
pub use service::{AuthService, LoginOutput, RegisterInput};
pub use token::AccessTokenClaims;
pub use totp::Provisioning;
