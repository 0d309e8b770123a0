//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Writes that must be atomic with
//! an audit entry take the prepared [`CreateAuditLogEntry`] and commit
//! both in a single transaction.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::NumisResult;
use crate::models::{
    account::{Account, CreateAccount, LockoutState, UpdateAccount},
    audit::{AuditAction, AuditLogEntry, CreateAuditLogEntry},
    coin::Coin,
};

/// Largest page a list query will return.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Largest offset handed to the store; it binds offsets as signed integers.
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// 1-based page request as received from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    /// Clamp to `1..` pages and `1..=MAX_PAGE_SIZE` items.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Offsets past [`MAX_OFFSET`] saturate, which reads as an empty page.
    pub fn to_pagination(self) -> Pagination {
        let n = self.normalized();
        let offset = (n.page - 1)
            .checked_mul(n.page_size)
            .map_or(MAX_OFFSET, |o| o.min(MAX_OFFSET));
        Pagination {
            offset,
            limit: n.page_size,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    /// 1-based page number this result represents.
    pub fn page(&self) -> u64 {
        if self.limit == 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub trait AccountRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the email is taken.
    fn create(&self, input: CreateAccount) -> impl Future<Output = NumisResult<Account>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = NumisResult<Account>> + Send;
    /// Exact, case-sensitive match on the stored email.
    fn get_by_email(&self, email: &str) -> impl Future<Output = NumisResult<Account>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateAccount,
    ) -> impl Future<Output = NumisResult<Account>> + Send;

    /// Replace the lockout counters only if they still equal `expected`.
    ///
    /// Returns `None` when another writer got there first; the caller
    /// re-reads and retries.
    fn compare_and_set_lockout(
        &self,
        id: Uuid,
        expected: LockoutState,
        next: LockoutState,
    ) -> impl Future<Output = NumisResult<Option<Account>>> + Send;

    /// Store `sealed_secret` only if the account has no secret yet and MFA
    /// is off.
    ///
    /// Returns `None` when a secret is already present; the caller
    /// re-reads and uses the stored one.
    fn provision_mfa_secret(
        &self,
        id: Uuid,
        sealed_secret: String,
    ) -> impl Future<Output = NumisResult<Option<Account>>> + Send;
}

// ---------------------------------------------------------------------------
// Coins (every write carries its audit entry)
// ---------------------------------------------------------------------------

pub trait CoinRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = NumisResult<Coin>> + Send;

    /// Insert `coin` and append `audit` atomically.
    fn insert(
        &self,
        coin: Coin,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = NumisResult<(Coin, AuditLogEntry)>> + Send;

    /// Insert many coins, each with its entry, in one transaction.
    fn insert_many(
        &self,
        batch: Vec<(Coin, CreateAuditLogEntry)>,
    ) -> impl Future<Output = NumisResult<Vec<(Coin, AuditLogEntry)>>> + Send;

    /// Overwrite the stored coin with `next` if its version is still
    /// `expected_version`, appending `audit` in the same transaction.
    /// A stale version fails with `Conflict` and writes nothing.
    fn replace(
        &self,
        expected_version: u64,
        next: Coin,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = NumisResult<(Coin, AuditLogEntry)>> + Send;

    /// Delete the coin if its version is still `expected_version`,
    /// appending `audit` in the same transaction.
    fn delete(
        &self,
        id: Uuid,
        expected_version: u64,
        audit: CreateAuditLogEntry,
    ) -> impl Future<Output = NumisResult<AuditLogEntry>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub action: Option<AuditAction>,
    pub coin_id: Option<Uuid>,
    /// Case-insensitive substring of the recorded actor email.
    pub actor_email: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = NumisResult<AuditLogEntry>> + Send;

    /// Entries matching `filter`, newest first.
    fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = NumisResult<PaginatedResult<AuditLogEntry>>> + Send;
}
