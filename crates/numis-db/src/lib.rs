//! Numis Database: SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema migrations ([`run_migrations`])
//! - Error types ([`DbError`])
//! - Repositories for accounts, coins and the audit log

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{SurrealAccountRepository, SurrealAuditLogRepository, SurrealCoinRepository};
pub use schema::{latest_version, run_migrations};
