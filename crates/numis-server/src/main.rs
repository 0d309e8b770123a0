//! Numis server entry point: load configuration, connect and migrate the
//! store, wire the services, then run until interrupted.

use std::sync::Arc;

use anyhow::Context;
use numis_audit::{AuditService, InventoryService};
use numis_auth::{AuthConfig, AuthService, MfaService};
use numis_core::clock::AuditClock;
use numis_db::{
    DbConfig, DbManager, SurrealAccountRepository, SurrealAuditLogRepository,
    SurrealCoinRepository,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("numis=info")),
        )
        .json()
        .init();

    tracing::info!("Starting Numis server...");

    let auth_config = AuthConfig::from_env().context("loading auth configuration")?;
    let db_config = DbConfig::from_env();
    let db = DbManager::connect(&db_config)
        .await
        .context("connecting to SurrealDB")?;
    db.migrate().await.context("applying schema migrations")?;

    let client = db.client().clone();
    let clock = Arc::new(AuditClock::new());

    let _auth = AuthService::new(
        SurrealAccountRepository::new(client.clone()),
        auth_config.clone(),
    );
    let _mfa = MfaService::new(SurrealAccountRepository::new(client.clone()), auth_config);
    let _audit = AuditService::new(SurrealAuditLogRepository::new(client.clone()), clock.clone());
    let _inventory = InventoryService::new(SurrealCoinRepository::new(client), clock);

    tracing::info!("services ready; waiting for shutdown signal");
    tokio::signal::ctrl_c()
        .await
        .context("listening for shutdown signal")?;

    tracing::info!("Numis server stopped.");
    Ok(())
}
