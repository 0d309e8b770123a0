//! Access token issuance and validation.
//!
//! Tokens are HS256-signed JWTs carrying only the subject and expiry.
//! Authorization facts (admin flag, lockout, MFA) are re-read from the
//! account on every request and never embedded here. There is no
//! revocation: a token stays valid until `exp`.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: the account id as a UUID string.
    pub sub: String,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Issue a token for `account_id` using the configured lifetime.
pub fn issue_access_token(account_id: Uuid, config: &AuthConfig) -> Result<String, AuthError> {
    let ttl = Duration::seconds(config.access_token_lifetime_secs as i64);
    issue_access_token_with_ttl(account_id, ttl, config)
}

/// Issue a token for `account_id` that expires `ttl` from now.
pub fn issue_access_token_with_ttl(
    account_id: Uuid,
    ttl: Duration,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let claims = AccessTokenClaims {
        sub: account_id.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Verify signature and expiry and return the claims.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["sub", "exp"]);
    validation.leeway = 0;

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

/// Validate a bearer token and return the account it names.
///
/// Pure computation: no store lookup happens here.
pub fn validate_access_token(token: &str, config: &AuthConfig) -> Result<Uuid, AuthError> {
    let claims = decode_access_token(token, config)?;
    Uuid::parse_str(&claims.sub)
        .map_err(|_| AuthError::TokenInvalid("subject is not an account id".into()))
}
