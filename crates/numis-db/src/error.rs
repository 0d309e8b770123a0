//! Database-specific error types and conversions.

use numis_core::error::NumisError;

/// Message thrown inside a coin transaction when the version guard fails.
pub(crate) const STALE_VERSION: &str = "stale coin version";

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity}")]
    Duplicate { entity: String },

    #[error("Stale version of {entity} {id}")]
    StaleVersion { entity: String, id: String },

    #[error("Audit log write failed: {0}")]
    AuditWrite(String),

    #[error("Stored data is invalid: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Classify the errors reported by a write statement or transaction.
    pub(crate) fn from_write(messages: Vec<String>, entity: &str, id: &str) -> Self {
        let joined = messages.join("; ");
        if joined.contains(STALE_VERSION) {
            DbError::StaleVersion {
                entity: entity.into(),
                id: id.into(),
            }
        } else if joined.contains("already contains") {
            DbError::Duplicate {
                entity: entity.into(),
            }
        } else if joined.contains("audit_log") {
            DbError::AuditWrite(joined)
        } else {
            DbError::Query(joined)
        }
    }
}

impl From<DbError> for NumisError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => NumisError::NotFound { entity, id },
            DbError::Duplicate { entity } => NumisError::AlreadyExists { entity },
            DbError::StaleVersion { entity, id } => NumisError::Conflict { entity, id },
            DbError::AuditWrite(msg) => NumisError::AuditWriteFailure(msg),
            other => NumisError::Database(other.to_string()),
        }
    }
}
