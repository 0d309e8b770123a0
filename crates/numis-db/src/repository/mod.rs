//! SurrealDB repository implementations.

mod account;
mod audit_log;
mod coin;

pub use account::SurrealAccountRepository;
pub use audit_log::SurrealAuditLogRepository;
pub use coin::SurrealCoinRepository;
