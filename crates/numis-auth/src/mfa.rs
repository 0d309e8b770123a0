//! TOTP enrollment lifecycle: `Disabled -> Provisioned -> Enabled -> Disabled`.
//!
//! `Provisioned` is an account holding a secret with `mfa_enabled = false`.
//! The secret only exists in clear inside these calls; the account row
//! always carries the AES-GCM ciphertext.

use numis_core::error::{NumisError, NumisResult};
use numis_core::models::account::{Account, UpdateAccount};
use numis_core::repository::AccountRepository;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::totp::{self, Provisioning};

pub struct MfaService<A: AccountRepository> {
    accounts: A,
    config: AuthConfig,
}

impl<A: AccountRepository> MfaService<A> {
    pub fn new(accounts: A, config: AuthConfig) -> Self {
        Self { accounts, config }
    }

    /// Provision a secret, or hand back the one already provisioned.
    ///
    /// Calling this twice before confirming yields the same secret.
    pub async fn begin_setup(&self, account_id: Uuid) -> NumisResult<Provisioning> {
        let account = self.accounts.get_by_id(account_id).await?;
        if account.mfa_enabled {
            return Err(AuthError::MfaAlreadyEnabled.into());
        }

        let secret = match stored_secret(&self.config, &account)? {
            Some(existing) => existing,
            None => {
                let fresh = totp::generate_secret();
                let sealed = totp::seal_secret(&self.config.mfa_encryption_key, &fresh)?;
                match self.accounts.provision_mfa_secret(account.id, sealed).await? {
                    Some(_) => {
                        info!(account_id = %account.id, "MFA secret provisioned");
                        fresh
                    }
                    // A concurrent setup stored its secret first.
                    None => {
                        let current = self.accounts.get_by_id(account.id).await?;
                        if current.mfa_enabled {
                            return Err(AuthError::MfaAlreadyEnabled.into());
                        }
                        stored_secret(&self.config, &current)?.ok_or_else(|| {
                            NumisError::Conflict {
                                entity: "account".into(),
                                id: account.id.to_string(),
                            }
                        })?
                    }
                }
            }
        };

        Ok(totp::provisioning(
            &secret,
            &self.config.totp_issuer,
            &account.email,
        )?)
    }

    /// Turn MFA on after proving possession of the provisioned secret.
    pub async fn confirm_setup(&self, account_id: Uuid, code: &str) -> NumisResult<Account> {
        let account = self.accounts.get_by_id(account_id).await?;
        if account.mfa_enabled {
            return Err(AuthError::MfaAlreadyEnabled.into());
        }
        let secret =
            stored_secret(&self.config, &account)?.ok_or(AuthError::NoSecretProvisioned)?;

        if !totp::verify_code(&secret, code, &self.config.totp_issuer, &account.email)? {
            warn!(account_id = %account.id, "MFA confirmation rejected");
            return Err(AuthError::MfaInvalidCode.into());
        }

        let updated = self
            .accounts
            .update(
                account.id,
                UpdateAccount {
                    mfa_enabled: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        info!(account_id = %updated.id, "MFA enabled");
        Ok(updated)
    }

    /// Turn MFA off. Requires a currently valid code.
    ///
    /// The flag and the secret are cleared in one write.
    pub async fn disable(&self, account_id: Uuid, code: &str) -> NumisResult<Account> {
        let account = self.accounts.get_by_id(account_id).await?;
        if !account.mfa_enabled {
            return Err(AuthError::MfaNotEnabled.into());
        }

        if !verify_login_code(&self.config, &account, code)? {
            warn!(account_id = %account.id, "MFA disable rejected");
            return Err(AuthError::MfaInvalidCode.into());
        }

        let updated = self
            .accounts
            .update(
                account.id,
                UpdateAccount {
                    mfa_enabled: Some(false),
                    mfa_secret: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        info!(account_id = %updated.id, "MFA disabled");
        Ok(updated)
    }
}

/// Check a second-factor code for an MFA-enabled account.
///
/// Does not touch lockout counters; the login flow owns those.
pub fn verify_login_code(config: &AuthConfig, account: &Account, code: &str) -> NumisResult<bool> {
    if !account.mfa_enabled {
        return Err(AuthError::MfaNotEnabled.into());
    }
    let Some(secret) = stored_secret(config, account)? else {
        error!(account_id = %account.id, "MFA enabled without a stored secret");
        return Err(NumisError::Internal(format!(
            "account {} has MFA enabled but no secret",
            account.id
        )));
    };
    Ok(totp::verify_code(
        &secret,
        code,
        &config.totp_issuer,
        &account.email,
    )?)
}

fn stored_secret(config: &AuthConfig, account: &Account) -> NumisResult<Option<String>> {
    account
        .mfa_secret
        .as_deref()
        .map(|sealed| totp::open_secret(&config.mfa_encryption_key, sealed))
        .transpose()
        .map_err(NumisError::from)
}
