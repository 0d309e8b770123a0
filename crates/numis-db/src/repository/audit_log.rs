//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! Append and list only. The `audit_log_immutable` event rejects
//! updates and deletes from any session, root included.

use chrono::{DateTime, Utc};
use numis_core::error::NumisResult;
use numis_core::models::audit::{AuditAction, AuditLogEntry, CreateAuditLogEntry};
use numis_core::repository::{AuditLogFilter, AuditLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Stored shape of an audit entry, written with `CONTENT`.
#[derive(Debug, Clone, SurrealValue)]
pub(crate) struct AuditRecord {
    action: String,
    coin_id: Option<String>,
    delta_quantity: Option<i64>,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
    note: Option<String>,
    actor_id: Option<String>,
    actor_email: String,
    created_at: DateTime<Utc>,
}

impl From<&CreateAuditLogEntry> for AuditRecord {
    fn from(entry: &CreateAuditLogEntry) -> Self {
        Self {
            action: entry.action.as_str().to_string(),
            coin_id: entry.coin_id.map(|id| id.to_string()),
            delta_quantity: entry.delta_quantity,
            before: entry.before.clone(),
            after: entry.after.clone(),
            note: entry.note.clone(),
            actor_id: entry.actor_id.map(|id| id.to_string()),
            actor_email: entry.actor_email.clone(),
            created_at: entry.created_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    action: String,
    coin_id: Option<String>,
    delta_quantity: Option<i64>,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
    note: Option<String>,
    actor_id: Option<String>,
    actor_email: String,
    created_at: DateTime<Utc>,
}

fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Corrupt(format!("invalid {field} UUID: {e}")))
}

impl AuditRowWithId {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        let action = AuditAction::parse(&self.action)
            .ok_or_else(|| DbError::Corrupt(format!("unknown audit action: {}", self.action)))?;
        Ok(AuditLogEntry {
            id: parse_uuid("audit", &self.record_id)?,
            action,
            coin_id: self
                .coin_id
                .as_deref()
                .map(|s| parse_uuid("coin", s))
                .transpose()?,
            delta_quantity: self.delta_quantity,
            before: self.before,
            after: self.after,
            note: self.note,
            actor_id: self
                .actor_id
                .as_deref()
                .map(|s| parse_uuid("actor", s))
                .transpose()?,
            actor_email: self.actor_email,
            created_at: self.created_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the audit log repository.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

fn where_clause(filter: &AuditLogFilter) -> String {
    let mut conditions = Vec::new();
    if filter.action.is_some() {
        conditions.push("action = $action");
    }
    if filter.coin_id.is_some() {
        conditions.push("coin_id = $coin_id");
    }
    if filter.actor_email.is_some() {
        conditions.push("string::contains(string::lowercase(actor_email), $actor_email)");
    }
    if filter.from.is_some() {
        conditions.push("created_at >= $from");
    }
    if filter.to.is_some() {
        conditions.push("created_at <= $to");
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditLogEntry) -> NumisResult<AuditLogEntry> {
        let id_str = input.id.to_string();

        let result = self
            .db
            .query("CREATE type::record('audit_log', $id) CONTENT $entry")
            .bind(("id", id_str))
            .bind(("entry", AuditRecord::from(&input)))
            .await
            .map_err(|e| DbError::AuditWrite(e.to_string()))?;

        result
            .check()
            .map_err(|e| DbError::AuditWrite(e.to_string()))?;

        Ok(AuditLogEntry::from(input))
    }

    async fn list(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> NumisResult<PaginatedResult<AuditLogEntry>> {
        let where_sql = where_clause(&filter);
        let count_sql = format!("SELECT count() AS total FROM audit_log{where_sql} GROUP ALL");
        let list_sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_log{where_sql} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset"
        );

        let action = filter.action.map(|a| a.as_str().to_string());
        let coin_id = filter.coin_id.map(|id| id.to_string());
        let actor_email = filter.actor_email.map(|e| e.to_lowercase());

        let mut count_query = self.db.query(&count_sql);
        let mut list_query = self.db.query(&list_sql);
        if let Some(action) = action {
            count_query = count_query.bind(("action", action.clone()));
            list_query = list_query.bind(("action", action));
        }
        if let Some(coin_id) = coin_id {
            count_query = count_query.bind(("coin_id", coin_id.clone()));
            list_query = list_query.bind(("coin_id", coin_id));
        }
        if let Some(actor_email) = actor_email {
            count_query = count_query.bind(("actor_email", actor_email.clone()));
            list_query = list_query.bind(("actor_email", actor_email));
        }
        if let Some(from) = filter.from {
            count_query = count_query.bind(("from", from));
            list_query = list_query.bind(("from", from));
        }
        if let Some(to) = filter.to {
            count_query = count_query.bind(("to", to));
            list_query = list_query.bind(("to", to));
        }

        let mut count_result = count_query.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = list_query
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<AuditRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
