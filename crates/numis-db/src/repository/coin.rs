//! SurrealDB implementation of [`CoinRepository`].
//!
//! Every write runs in one transaction together with the audit entry
//! that describes it. Replacements and deletes are guarded by the
//! coin's `version`; a mismatch throws inside the transaction so
//! neither the coin nor the audit row is written.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use numis_core::error::NumisResult;
use numis_core::models::audit::{AuditLogEntry, CreateAuditLogEntry};
use numis_core::models::coin::{Coin, Originality};
use numis_core::repository::CoinRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::audit_log::AuditRecord;
use crate::error::DbError;

/// Stored shape of a coin, used both for writes (`CONTENT`) and reads.
#[derive(Debug, Clone, SurrealValue)]
pub(crate) struct CoinRecord {
    owner_id: String,
    title: String,
    quantity: i64,
    year: i32,
    country: String,
    face_value: String,
    purchase_price: Option<f64>,
    estimated_value: Option<f64>,
    originality: String,
    condition: Option<String>,
    storage_location: Option<String>,
    category: Option<String>,
    acquisition_date: Option<DateTime<Utc>>,
    acquisition_source: Option<String>,
    notes: Option<String>,
    image_url_front: Option<String>,
    image_url_back: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Coin> for CoinRecord {
    fn from(coin: &Coin) -> Self {
        Self {
            owner_id: coin.owner_id.to_string(),
            title: coin.title.clone(),
            quantity: coin.quantity,
            year: coin.year,
            country: coin.country.clone(),
            face_value: coin.face_value.clone(),
            purchase_price: coin.purchase_price,
            estimated_value: coin.estimated_value,
            originality: coin.originality.as_str().to_string(),
            condition: coin.condition.clone(),
            storage_location: coin.storage_location.clone(),
            category: coin.category.clone(),
            acquisition_date: coin.acquisition_date,
            acquisition_source: coin.acquisition_source.clone(),
            notes: coin.notes.clone(),
            image_url_front: coin.image_url_front.clone(),
            image_url_back: coin.image_url_back.clone(),
            version: coin.version,
            created_at: coin.created_at,
            updated_at: coin.updated_at,
        }
    }
}

impl CoinRecord {
    fn into_coin(self, id: Uuid) -> Result<Coin, DbError> {
        let owner_id = Uuid::parse_str(&self.owner_id)
            .map_err(|e| DbError::Corrupt(format!("invalid owner UUID: {e}")))?;
        let originality = Originality::parse(&self.originality).ok_or_else(|| {
            DbError::Corrupt(format!("unknown originality: {}", self.originality))
        })?;
        Ok(Coin {
            id,
            owner_id,
            title: self.title,
            quantity: self.quantity,
            year: self.year,
            country: self.country,
            face_value: self.face_value,
            purchase_price: self.purchase_price,
            estimated_value: self.estimated_value,
            originality,
            condition: self.condition,
            storage_location: self.storage_location,
            category: self.category,
            acquisition_date: self.acquisition_date,
            acquisition_source: self.acquisition_source,
            notes: self.notes,
            image_url_front: self.image_url_front,
            image_url_back: self.image_url_back,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

/// One coin insert plus its audit row, bound as a single value.
#[derive(Debug, SurrealValue)]
struct InsertItem {
    coin_id: String,
    coin: CoinRecord,
    audit_id: String,
    audit: AuditRecord,
}

const INSERT_BATCH: &str = "\
BEGIN TRANSACTION;
FOR $item IN $batch {
    CREATE type::record('coin', $item.coin_id) CONTENT $item.coin;
    CREATE type::record('audit_log', $item.audit_id) CONTENT $item.audit;
};
COMMIT TRANSACTION;";

const REPLACE_GUARDED: &str = "\
BEGIN TRANSACTION;
LET $written = (UPDATE type::record('coin', $coin_id) CONTENT $coin \
    WHERE version = $expected_version RETURN AFTER);
IF array::len($written) = 0 { THROW 'stale coin version'; };
CREATE type::record('audit_log', $audit_id) CONTENT $audit;
COMMIT TRANSACTION;";

const DELETE_GUARDED: &str = "\
BEGIN TRANSACTION;
LET $removed = (DELETE type::record('coin', $coin_id) \
    WHERE version = $expected_version RETURN BEFORE);
IF array::len($removed) = 0 { THROW 'stale coin version'; };
CREATE type::record('audit_log', $audit_id) CONTENT $audit;
COMMIT TRANSACTION;";

/// SurrealDB implementation of the coin repository.
#[derive(Clone)]
pub struct SurrealCoinRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCoinRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

/// Turn the statement errors of a transaction response into a [`DbError`].
fn ensure_committed(errors: HashMap<usize, surrealdb::Error>, id: &Uuid) -> Result<(), DbError> {
    if errors.is_empty() {
        return Ok(());
    }
    let mut indexed: Vec<_> = errors.into_iter().collect();
    indexed.sort_by_key(|(index, _)| *index);
    let messages = indexed.into_iter().map(|(_, e)| e.to_string()).collect();
    Err(DbError::from_write(messages, "coin", &id.to_string()))
}

impl<C: Connection> CoinRepository for SurrealCoinRepository<C> {
    async fn get_by_id(&self, id: Uuid) -> NumisResult<Coin> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('coin', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CoinRecord> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "coin".into(),
            id: id_str,
        })?;

        Ok(row.into_coin(id)?)
    }

    async fn insert(
        &self,
        coin: Coin,
        audit: CreateAuditLogEntry,
    ) -> NumisResult<(Coin, AuditLogEntry)> {
        let mut written = self.insert_many(vec![(coin, audit)]).await?;
        written.pop().ok_or_else(|| {
            DbError::Query("insert transaction returned no rows".into()).into()
        })
    }

    async fn insert_many(
        &self,
        batch: Vec<(Coin, CreateAuditLogEntry)>,
    ) -> NumisResult<Vec<(Coin, AuditLogEntry)>> {
        let Some(first_id) = batch.first().map(|(coin, _)| coin.id) else {
            return Ok(Vec::new());
        };

        let items: Vec<InsertItem> = batch
            .iter()
            .map(|(coin, audit)| InsertItem {
                coin_id: coin.id.to_string(),
                coin: CoinRecord::from(coin),
                audit_id: audit.id.to_string(),
                audit: AuditRecord::from(audit),
            })
            .collect();

        let mut response = self
            .db
            .query(INSERT_BATCH)
            .bind(("batch", items))
            .await
            .map_err(DbError::from)?;
        ensure_committed(response.take_errors(), &first_id)?;

        debug!(count = batch.len(), "coins inserted");
        Ok(batch
            .into_iter()
            .map(|(coin, audit)| (coin, AuditLogEntry::from(audit)))
            .collect())
    }

    async fn replace(
        &self,
        expected_version: u64,
        next: Coin,
        audit: CreateAuditLogEntry,
    ) -> NumisResult<(Coin, AuditLogEntry)> {
        let mut response = self
            .db
            .query(REPLACE_GUARDED)
            .bind(("coin_id", next.id.to_string()))
            .bind(("coin", CoinRecord::from(&next)))
            .bind(("expected_version", expected_version))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", AuditRecord::from(&audit)))
            .await
            .map_err(DbError::from)?;
        ensure_committed(response.take_errors(), &next.id)?;

        Ok((next, AuditLogEntry::from(audit)))
    }

    async fn delete(
        &self,
        id: Uuid,
        expected_version: u64,
        audit: CreateAuditLogEntry,
    ) -> NumisResult<AuditLogEntry> {
        let mut response = self
            .db
            .query(DELETE_GUARDED)
            .bind(("coin_id", id.to_string()))
            .bind(("expected_version", expected_version))
            .bind(("audit_id", audit.id.to_string()))
            .bind(("audit", AuditRecord::from(&audit)))
            .await
            .map_err(DbError::from)?;
        ensure_committed(response.take_errors(), &id)?;

        Ok(AuditLogEntry::from(audit))
    }
}
