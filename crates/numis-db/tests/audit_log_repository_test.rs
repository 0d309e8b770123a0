//! Integration tests for audit log filtering and pagination.

use chrono::{DateTime, Duration, Utc};
use numis_core::models::audit::{AuditAction, CreateAuditLogEntry};
use numis_core::repository::{AuditLogFilter, AuditLogRepository, PageRequest, Pagination};
use numis_db::SurrealAuditLogRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealAuditLogRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    numis_db::run_migrations(&db).await.unwrap();
    SurrealAuditLogRepository::new(db)
}

fn entry(
    action: AuditAction,
    coin_id: Option<Uuid>,
    actor_email: &str,
    created_at: DateTime<Utc>,
) -> CreateAuditLogEntry {
    CreateAuditLogEntry {
        id: Uuid::new_v4(),
        action,
        coin_id,
        delta_quantity: Some(1),
        before: None,
        after: Some(serde_json::json!({ "quantity": 1 })),
        note: None,
        actor_id: None,
        actor_email: actor_email.into(),
        created_at,
    }
}

/// Ten entries one minute apart, oldest first. Returns the base time.
async fn seed(repo: &SurrealAuditLogRepository<Db>, coin: Uuid) -> DateTime<Utc> {
    let base = Utc::now() - Duration::hours(1);
    for i in 0..10 {
        let action = if i % 2 == 0 {
            AuditAction::AdjustIn
        } else {
            AuditAction::AdjustOut
        };
        let actor = if i < 5 {
            "Admin@Example.com"
        } else {
            "clerk@example.com"
        };
        let coin_id = if i < 3 { Some(coin) } else { None };
        repo.append(entry(action, coin_id, actor, base + Duration::minutes(i)))
            .await
            .unwrap();
    }
    base
}

fn all() -> Pagination {
    Pagination {
        offset: 0,
        limit: 100,
    }
}

#[tokio::test]
async fn append_round_trips_all_fields() {
    let repo = setup().await;
    let coin = Uuid::new_v4();
    let actor = Uuid::new_v4();
    let now = Utc::now();

    let written = repo
        .append(CreateAuditLogEntry {
            id: Uuid::new_v4(),
            action: AuditAction::Update,
            coin_id: Some(coin),
            delta_quantity: Some(-2),
            before: Some(serde_json::json!({ "title": "old", "quantity": 5 })),
            after: Some(serde_json::json!({ "title": "new", "quantity": 3 })),
            note: Some("recount".into()),
            actor_id: Some(actor),
            actor_email: "admin@example.com".into(),
            created_at: now,
        })
        .await
        .unwrap();

    let page = repo.list(AuditLogFilter::default(), all()).await.unwrap();
    assert_eq!(page.total, 1);
    let stored = &page.items[0];
    assert_eq!(stored.id, written.id);
    assert_eq!(stored.action, AuditAction::Update);
    assert_eq!(stored.coin_id, Some(coin));
    assert_eq!(stored.actor_id, Some(actor));
    assert_eq!(stored.delta_quantity, Some(-2));
    assert_eq!(stored.note.as_deref(), Some("recount"));
    assert_eq!(stored.before.as_ref().unwrap()["title"], "old");
    assert_eq!(stored.after.as_ref().unwrap()["quantity"], 3);
    assert_eq!(stored.created_at, now);
}

#[tokio::test]
async fn list_is_newest_first() {
    let repo = setup().await;
    seed(&repo, Uuid::new_v4()).await;

    let page = repo.list(AuditLogFilter::default(), all()).await.unwrap();
    assert_eq!(page.total, 10);
    for pair in page.items.windows(2) {
        assert!(pair[0].created_at > pair[1].created_at);
    }
}

#[tokio::test]
async fn date_range_is_inclusive() {
    let repo = setup().await;
    let base = seed(&repo, Uuid::new_v4()).await;

    let from = base + Duration::minutes(2);
    let to = base + Duration::minutes(5);
    let page = repo
        .list(
            AuditLogFilter {
                from: Some(from),
                to: Some(to),
                ..Default::default()
            },
            all(),
        )
        .await
        .unwrap();

    assert_eq!(page.total, 4);
    assert!(
        page.items
            .iter()
            .all(|e| e.created_at >= from && e.created_at <= to)
    );
    assert_eq!(page.items.first().unwrap().created_at, to);
    assert_eq!(page.items.last().unwrap().created_at, from);
}

#[tokio::test]
async fn filters_combine() {
    let repo = setup().await;
    let coin = Uuid::new_v4();
    seed(&repo, coin).await;

    let by_action = repo
        .list(
            AuditLogFilter {
                action: Some(AuditAction::AdjustIn),
                ..Default::default()
            },
            all(),
        )
        .await
        .unwrap();
    assert_eq!(by_action.total, 5);

    let by_coin = repo
        .list(
            AuditLogFilter {
                coin_id: Some(coin),
                ..Default::default()
            },
            all(),
        )
        .await
        .unwrap();
    assert_eq!(by_coin.total, 3);

    let by_actor = repo
        .list(
            AuditLogFilter {
                actor_email: Some("admin@EXAMPLE".into()),
                action: Some(AuditAction::AdjustOut),
                ..Default::default()
            },
            all(),
        )
        .await
        .unwrap();
    // Admin wrote i = 0..5; the odd ones are adjust_out.
    assert_eq!(by_actor.total, 2);
    assert!(
        by_actor
            .items
            .iter()
            .all(|e| e.actor_email == "Admin@Example.com")
    );
}

#[tokio::test]
async fn pagination_slices_and_counts() {
    let repo = setup().await;
    seed(&repo, Uuid::new_v4()).await;

    let page = repo
        .list(
            AuditLogFilter::default(),
            PageRequest::new(2, 4).to_pagination(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 10);
    assert_eq!(page.items.len(), 4);
    assert_eq!(page.page(), 2);
    assert_eq!(page.total_pages(), 3);

    let last = repo
        .list(
            AuditLogFilter::default(),
            PageRequest::new(3, 4).to_pagination(),
        )
        .await
        .unwrap();
    assert_eq!(last.items.len(), 2);
}

#[tokio::test]
async fn empty_result_has_zero_total() {
    let repo = setup().await;
    let page = repo
        .list(
            AuditLogFilter {
                coin_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
            all(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
}
