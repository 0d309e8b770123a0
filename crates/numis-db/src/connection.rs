//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::{latest_version, run_migrations};

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "numis".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Read `NUMIS_DB_URL`, `NUMIS_DB_NAMESPACE`, `NUMIS_DB_DATABASE`,
    /// `NUMIS_DB_USERNAME` and `NUMIS_DB_PASSWORD`, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            url: lookup("NUMIS_DB_URL").unwrap_or(defaults.url),
            namespace: lookup("NUMIS_DB_NAMESPACE").unwrap_or(defaults.namespace),
            database: lookup("NUMIS_DB_DATABASE").unwrap_or(defaults.database),
            username: lookup("NUMIS_DB_USERNAME").unwrap_or(defaults.username),
            password: lookup("NUMIS_DB_PASSWORD").unwrap_or(defaults.password),
        }
    }
}

/// Manages a connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Sign in as root and select the configured namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Connected to SurrealDB");

        Ok(Self { db })
    }

    /// Bring the schema up to date. Returns the resulting version.
    pub async fn migrate(&self) -> Result<u32, DbError> {
        run_migrations(&self.db).await?;
        let version = latest_version();
        info!(schema_version = version, "schema ready");
        Ok(version)
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        let config = DbConfig::from_lookup(|name| match name {
            "NUMIS_DB_URL" => Some("db.internal:8000".into()),
            "NUMIS_DB_DATABASE" => Some("coins".into()),
            _ => None,
        });
        assert_eq!(config.url, "db.internal:8000");
        assert_eq!(config.database, "coins");
        assert_eq!(config.namespace, "numis");
        assert_eq!(config.username, "root");
    }
}
