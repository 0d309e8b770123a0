//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "audit_log_filters",
        sql: SCHEMA_V2,
    },
    Migration {
        version: 3,
        name: "audit_log_immutable",
        sql: SCHEMA_V3,
    },
];

// -----------------------------------------------------------------------
// Schema v1: accounts, coins, audit log
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Accounts
-- =======================================================================
DEFINE TABLE account SCHEMAFULL;
DEFINE FIELD email ON TABLE account TYPE string;
DEFINE FIELD display_name ON TABLE account TYPE option<string>;
DEFINE FIELD password_hash ON TABLE account TYPE string;
DEFINE FIELD is_admin ON TABLE account TYPE bool DEFAULT false;
DEFINE FIELD mfa_enabled ON TABLE account TYPE bool DEFAULT false;
DEFINE FIELD mfa_secret ON TABLE account TYPE option<string>;
DEFINE FIELD failed_login_attempts ON TABLE account TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD locked_until ON TABLE account TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_account_email ON TABLE account COLUMNS email UNIQUE;

-- =======================================================================
-- Coins
-- =======================================================================
DEFINE TABLE coin SCHEMAFULL;
DEFINE FIELD owner_id ON TABLE coin TYPE string;
DEFINE FIELD title ON TABLE coin TYPE string;
DEFINE FIELD quantity ON TABLE coin TYPE int ASSERT $value >= 0;
DEFINE FIELD year ON TABLE coin TYPE int;
DEFINE FIELD country ON TABLE coin TYPE string;
DEFINE FIELD face_value ON TABLE coin TYPE string;
DEFINE FIELD purchase_price ON TABLE coin TYPE option<float>;
DEFINE FIELD estimated_value ON TABLE coin TYPE option<float>;
DEFINE FIELD originality ON TABLE coin TYPE string \
    ASSERT $value IN ['original', 'replica', 'unknown'];
DEFINE FIELD condition ON TABLE coin TYPE option<string>;
DEFINE FIELD storage_location ON TABLE coin TYPE option<string>;
DEFINE FIELD category ON TABLE coin TYPE option<string>;
DEFINE FIELD acquisition_date ON TABLE coin TYPE option<datetime>;
DEFINE FIELD acquisition_source ON TABLE coin TYPE option<string>;
DEFINE FIELD notes ON TABLE coin TYPE option<string>;
DEFINE FIELD image_url_front ON TABLE coin TYPE option<string>;
DEFINE FIELD image_url_back ON TABLE coin TYPE option<string>;
DEFINE FIELD version ON TABLE coin TYPE int ASSERT $value >= 1;
DEFINE FIELD created_at ON TABLE coin TYPE datetime;
DEFINE FIELD updated_at ON TABLE coin TYPE datetime;
DEFINE INDEX idx_coin_owner ON TABLE coin COLUMNS owner_id;

-- =======================================================================
-- Audit Log (append-only)
--
-- coin_id and actor_id are plain strings, not record links: deleting
-- the coin or the account must leave the history untouched.
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD action ON TABLE audit_log TYPE string \
    ASSERT $value IN ['create', 'update', 'delete', 'import', \
    'adjust_in', 'adjust_out'];
DEFINE FIELD coin_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD delta_quantity ON TABLE audit_log TYPE option<int>;
DEFINE FIELD before ON TABLE audit_log TYPE option<object> FLEXIBLE;
DEFINE FIELD after ON TABLE audit_log TYPE option<object> FLEXIBLE;
DEFINE FIELD note ON TABLE audit_log TYPE option<string>;
DEFINE FIELD actor_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD actor_email ON TABLE audit_log TYPE string;
DEFINE FIELD created_at ON TABLE audit_log TYPE datetime;
DEFINE INDEX idx_audit_created ON TABLE audit_log COLUMNS created_at;
";

// -----------------------------------------------------------------------
// Schema v2: indexes backing the audit list filters
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE INDEX IF NOT EXISTS idx_audit_coin ON TABLE audit_log \
    COLUMNS coin_id, created_at;
DEFINE INDEX IF NOT EXISTS idx_audit_action ON TABLE audit_log \
    COLUMNS action, created_at;
";

// -----------------------------------------------------------------------
// Schema v3: reject audit rewrites for every session
//
// Table PERMISSIONS only bind record-level users. The event fires for
// root and namespace sessions too, and its THROW aborts the statement.
// -----------------------------------------------------------------------

const SCHEMA_V3: &str = "\
DEFINE EVENT IF NOT EXISTS audit_log_immutable ON TABLE audit_log \
    WHEN $event = 'UPDATE' OR $event = 'DELETE' \
    THEN { THROW 'audit_log entries are append-only'; };
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Latest schema version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
