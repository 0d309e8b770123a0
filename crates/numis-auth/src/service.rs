//! Authentication service: registration, login, and bearer resolution.

use chrono::Utc;
use numis_core::error::{NumisError, NumisResult};
use numis_core::models::account::{Account, CreateAccount, LockoutState, UpdateAccount};
use numis_core::repository::AccountRepository;
use tracing::{info, warn};
use validator::ValidateEmail;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::lockout::{LockStatus, LockoutPolicy};
use crate::{mfa, password, token};

/// Attempts at a lockout compare-and-set before giving up.
const LOCKOUT_CAS_RETRIES: usize = 8;

/// Input for account registration.
#[derive(Debug)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Result of the password step.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed access token. `None` when a second factor is still owed.
    pub token: Option<String>,
    pub mfa_required: bool,
}

/// Authentication service.
///
/// Generic over the account repository so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<A: AccountRepository> {
    accounts: A,
    config: AuthConfig,
    lockout: LockoutPolicy,
}

impl<A: AccountRepository> AuthService<A> {
    pub fn new(accounts: A, config: AuthConfig) -> Self {
        let lockout = LockoutPolicy::from_config(&config);
        Self {
            accounts,
            config,
            lockout,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Create a non-admin account.
    pub async fn register(&self, input: RegisterInput) -> NumisResult<Account> {
        if !input.email.validate_email() {
            return Err(NumisError::Validation {
                message: "email must be a valid address".into(),
            });
        }
        if input.password.chars().count() < self.config.min_password_length {
            return Err(NumisError::Validation {
                message: format!(
                    "password must be at least {} characters",
                    self.config.min_password_length
                ),
            });
        }

        match self.accounts.get_by_email(&input.email).await {
            Ok(_) => {
                return Err(NumisError::AlreadyExists {
                    entity: "account".into(),
                });
            }
            Err(NumisError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let password_hash = password::hash_password_async(input.password).await?;
        let account = self
            .accounts
            .create(CreateAccount {
                email: input.email,
                password_hash,
                display_name: input.display_name,
                is_admin: false,
            })
            .await?;

        info!(account_id = %account.id, "account registered");
        Ok(account)
    }

    /// Password step of login.
    ///
    /// For MFA-enabled accounts no token is minted here and the failure
    /// counter is left alone; [`login_mfa`](Self::login_mfa) finishes the job.
    pub async fn login(&self, email: &str, password: &str) -> NumisResult<LoginOutput> {
        let account = self.check_password(email, password).await?;

        if account.mfa_enabled {
            info!(account_id = %account.id, "password accepted, second factor required");
            return Ok(LoginOutput {
                token: None,
                mfa_required: true,
            });
        }

        let account = self.record_success(account).await?;
        let token = token::issue_access_token(account.id, &self.config)?;
        info!(account_id = %account.id, "login succeeded");
        Ok(LoginOutput {
            token: Some(token),
            mfa_required: false,
        })
    }

    /// Password plus TOTP login. A wrong code counts as a failed attempt.
    pub async fn login_mfa(
        &self,
        email: &str,
        password: &str,
        totp_code: &str,
    ) -> NumisResult<String> {
        let account = self.check_password(email, password).await?;

        if !account.mfa_enabled {
            return Err(AuthError::MfaNotEnabled.into());
        }

        if !mfa::verify_login_code(&self.config, &account, totp_code)? {
            warn!(account_id = %account.id, "login rejected: invalid TOTP code");
            self.record_failure(account).await?;
            return Err(AuthError::MfaInvalidCode.into());
        }

        let account = self.record_success(account).await?;
        let token = token::issue_access_token(account.id, &self.config)?;
        info!(account_id = %account.id, "MFA login succeeded");
        Ok(token)
    }

    /// Resolve a bearer token to the current account record.
    pub async fn authenticate(&self, bearer: &str) -> NumisResult<Account> {
        let account_id = token::validate_access_token(bearer, &self.config)?;
        match self.accounts.get_by_id(account_id).await {
            Ok(account) => Ok(account),
            Err(NumisError::NotFound { .. }) => Err(NumisError::InvalidToken),
            Err(e) => Err(e),
        }
    }

    pub fn require_admin(&self, account: &Account) -> NumisResult<()> {
        if account.is_admin {
            Ok(())
        } else {
            Err(NumisError::AuthorizationDenied {
                reason: "administrator privileges required".into(),
            })
        }
    }

    /// Look up, enforce the lock, then compare the password.
    ///
    /// Unknown emails still pay for one hash verification.
    async fn check_password(&self, email: &str, password: &str) -> NumisResult<Account> {
        let account = match self.accounts.get_by_email(email).await {
            Ok(account) => account,
            Err(NumisError::NotFound { .. }) => {
                let _ = password::verify_password_async(
                    password.to_string(),
                    password::TIMING_EQUALIZER_HASH.to_string(),
                )
                .await;
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        if let LockStatus::Locked {
            remaining_minutes, ..
        } = self.lockout.status(&account.lockout_state(), Utc::now())
        {
            warn!(account_id = %account.id, remaining_minutes, "login rejected: account locked");
            return Err(AuthError::AccountLocked { remaining_minutes }.into());
        }

        let valid =
            password::verify_password_async(password.to_string(), account.password_hash.clone())
                .await?;
        if !valid {
            warn!(account_id = %account.id, "login rejected: wrong password");
            self.record_failure(account).await?;
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(self.maybe_rehash(account, password).await)
    }

    async fn record_failure(&self, account: Account) -> NumisResult<Account> {
        let policy = self.lockout;
        let updated = self
            .transition(account, move |state| policy.register_failure(state, Utc::now()))
            .await?;
        if updated.locked_until.is_some() {
            warn!(
                account_id = %updated.id,
                failed_attempts = updated.failed_login_attempts,
                "account locked"
            );
        }
        Ok(updated)
    }

    async fn record_success(&self, account: Account) -> NumisResult<Account> {
        if account.lockout_state() == LockoutState::default() {
            return Ok(account);
        }
        let policy = self.lockout;
        self.transition(account, move |_| policy.reset()).await
    }

    /// Apply `next` to the stored lockout counters atomically.
    async fn transition<F>(&self, mut account: Account, next: F) -> NumisResult<Account>
    where
        F: Fn(&LockoutState) -> LockoutState,
    {
        for _ in 0..LOCKOUT_CAS_RETRIES {
            let expected = account.lockout_state();
            let target = next(&expected);
            if let Some(updated) = self
                .accounts
                .compare_and_set_lockout(account.id, expected, target)
                .await?
            {
                return Ok(updated);
            }
            account = self.accounts.get_by_id(account.id).await?;
        }

        warn!(account_id = %account.id, "lockout update kept losing races");
        Err(NumisError::Conflict {
            entity: "account".into(),
            id: account.id.to_string(),
        })
    }

    /// Upgrade an outdated hash after a successful check. Best effort.
    async fn maybe_rehash(&self, account: Account, password: &str) -> Account {
        if !password::needs_rehash(&account.password_hash) {
            return account;
        }
        let rehashed = match password::hash_password_async(password.to_string()).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(account_id = %account.id, error = %e, "password rehash failed");
                return account;
            }
        };
        match self
            .accounts
            .update(
                account.id,
                UpdateAccount {
                    password_hash: Some(rehashed),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(updated) => {
                info!(account_id = %updated.id, "password hash upgraded");
                updated
            }
            Err(e) => {
                warn!(account_id = %account.id, error = %e, "storing rehashed password failed");
                account
            }
        }
    }
}
