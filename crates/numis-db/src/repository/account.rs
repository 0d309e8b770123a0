//! SurrealDB implementation of [`AccountRepository`].

use chrono::{DateTime, Utc};
use numis_core::error::NumisResult;
use numis_core::models::account::{Account, CreateAccount, LockoutState, UpdateAccount};
use numis_core::repository::AccountRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct AccountRow {
    email: String,
    display_name: Option<String>,
    password_hash: String,
    is_admin: bool,
    mfa_enabled: bool,
    mfa_secret: Option<String>,
    failed_login_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AccountRowWithId {
    record_id: String,
    email: String,
    display_name: Option<String>,
    password_hash: String,
    is_admin: bool,
    mfa_enabled: bool,
    mfa_secret: Option<String>,
    failed_login_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self, id: Uuid) -> Account {
        Account {
            id,
            email: self.email,
            display_name: self.display_name,
            password_hash: self.password_hash,
            is_admin: self.is_admin,
            mfa_enabled: self.mfa_enabled,
            mfa_secret: self.mfa_secret,
            failed_login_attempts: self.failed_login_attempts,
            locked_until: self.locked_until,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl AccountRowWithId {
    fn try_into_account(self) -> Result<Account, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid account UUID: {e}")))?;
        Ok(AccountRow {
            email: self.email,
            display_name: self.display_name,
            password_hash: self.password_hash,
            is_admin: self.is_admin,
            mfa_enabled: self.mfa_enabled,
            mfa_secret: self.mfa_secret,
            failed_login_attempts: self.failed_login_attempts,
            locked_until: self.locked_until,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_account(id))
    }
}

/// SurrealDB implementation of the account repository.
#[derive(Clone)]
pub struct SurrealAccountRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccountRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

fn not_found(id: impl Into<String>) -> DbError {
    DbError::NotFound {
        entity: "account".into(),
        id: id.into(),
    }
}

impl<C: Connection> AccountRepository for SurrealAccountRepository<C> {
    async fn create(&self, input: CreateAccount) -> NumisResult<Account> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('account', $id) SET \
                 email = $email, display_name = $display_name, \
                 password_hash = $password_hash, is_admin = $is_admin, \
                 mfa_enabled = false, mfa_secret = NONE, \
                 failed_login_attempts = 0, locked_until = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email))
            .bind(("display_name", input.display_name))
            .bind(("password_hash", input.password_hash))
            .bind(("is_admin", input.is_admin))
            .await
            .map_err(DbError::from)?;

        let errors = result.take_errors();
        if !errors.is_empty() {
            let messages = errors.into_values().map(|e| e.to_string()).collect();
            return Err(DbError::from_write(messages, "account", &id_str).into());
        }

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(&id_str))?;

        Ok(row.into_account(id))
    }

    async fn get_by_id(&self, id: Uuid) -> NumisResult<Account> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('account', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(id_str))?;

        Ok(row.into_account(id))
    }

    async fn get_by_email(&self, email: &str) -> NumisResult<Account> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM account \
                 WHERE email = $email",
            )
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| not_found(format!("email={email}")))?;

        Ok(row.try_into_account()?)
    }

    async fn update(&self, id: Uuid, input: UpdateAccount) -> NumisResult<Account> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.display_name.is_some() {
            sets.push("display_name = $display_name");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.is_admin.is_some() {
            sets.push("is_admin = $is_admin");
        }
        if input.mfa_enabled.is_some() {
            sets.push("mfa_enabled = $mfa_enabled");
        }
        if input.mfa_secret.is_some() {
            sets.push("mfa_secret = $mfa_secret");
        }
        sets.push("updated_at = time::now()");

        // UPDATE on a missing record id returns nothing rather than creating it.
        let query = format!(
            "UPDATE type::record('account', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(display_name) = input.display_name {
            builder = builder.bind(("display_name", display_name));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(is_admin) = input.is_admin {
            builder = builder.bind(("is_admin", is_admin));
        }
        if let Some(mfa_enabled) = input.mfa_enabled {
            builder = builder.bind(("mfa_enabled", mfa_enabled));
        }
        if let Some(mfa_secret) = input.mfa_secret {
            // Some(Some(v)) = set, Some(None) = clear
            builder = builder.bind(("mfa_secret", mfa_secret));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(id_str))?;

        Ok(row.into_account(id))
    }

    async fn compare_and_set_lockout(
        &self,
        id: Uuid,
        expected: LockoutState,
        next: LockoutState,
    ) -> NumisResult<Option<Account>> {
        let result = self
            .db
            .query(
                "UPDATE type::record('account', $id) SET \
                 failed_login_attempts = $next_attempts, \
                 locked_until = $next_locked_until, \
                 updated_at = time::now() \
                 WHERE failed_login_attempts = $expected_attempts \
                 AND locked_until = $expected_locked_until",
            )
            .bind(("id", id.to_string()))
            .bind(("next_attempts", next.failed_attempts))
            .bind(("next_locked_until", next.locked_until))
            .bind(("expected_attempts", expected.failed_attempts))
            .bind(("expected_locked_until", expected.locked_until))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(|row| row.into_account(id)))
    }

    async fn provision_mfa_secret(
        &self,
        id: Uuid,
        sealed_secret: String,
    ) -> NumisResult<Option<Account>> {
        let result = self
            .db
            .query(
                "UPDATE type::record('account', $id) SET \
                 mfa_secret = $secret, \
                 updated_at = time::now() \
                 WHERE (mfa_secret = NONE OR mfa_secret = NULL) \
                 AND mfa_enabled = false",
            )
            .bind(("id", id.to_string()))
            .bind(("secret", sealed_secret))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(|row| row.into_account(id)))
    }
}
