//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    numis_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("account"), "missing account table");
    assert!(info_str.contains("coin"), "missing coin table");
    assert!(info_str.contains("audit_log"), "missing audit_log table");
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    numis_db::run_migrations(&db).await.unwrap();
    numis_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(
        records.len(),
        numis_db::latest_version() as usize,
        "each migration is recorded exactly once"
    );
}

#[tokio::test]
async fn unique_index_prevents_duplicate_emails() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    numis_db::run_migrations(&db).await.unwrap();

    let insert = "CREATE account SET email = 'a@example.com', password_hash = 'x'";
    db.query(insert).await.unwrap().check().unwrap();

    let result = db.query(insert).await.unwrap().check();
    assert!(result.is_err(), "duplicate email should be rejected");
}

#[tokio::test]
async fn audit_log_rejects_unknown_action() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    numis_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE audit_log SET action = 'rename', actor_email = 'a@example.com', \
             created_at = time::now()",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "action outside the closed set should be rejected");
}

#[tokio::test]
async fn coin_quantity_cannot_be_negative() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    numis_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE coin SET owner_id = 'o', title = 't', quantity = -1, year = 1900, \
             country = 'X', face_value = '1', originality = 'unknown', version = 1, \
             created_at = time::now(), updated_at = time::now()",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err());
}

#[tokio::test]
async fn audit_log_rejects_update_and_delete_as_root() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    numis_db::run_migrations(&db).await.unwrap();

    db.query(
        "CREATE audit_log:entry SET action = 'create', actor_email = 'a@example.com', \
         created_at = time::now()",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let update = db
        .query("UPDATE audit_log:entry SET actor_email = 'forged@example.com'")
        .await
        .unwrap()
        .check();
    assert!(update.is_err(), "audit entries must not be rewritten");

    let delete = db.query("DELETE audit_log:entry").await.unwrap().check();
    assert!(delete.is_err(), "audit entries must not be removed");

    let mut result = db
        .query("SELECT VALUE actor_email FROM audit_log:entry")
        .await
        .unwrap();
    let emails: Vec<String> = result.take(0).unwrap();
    assert_eq!(emails, vec!["a@example.com".to_string()]);
}
