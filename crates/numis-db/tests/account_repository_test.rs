//! Integration tests for the account repository using in-memory SurrealDB.

use chrono::{Duration, Utc};
use numis_core::error::NumisError;
use numis_core::models::account::{CreateAccount, LockoutState, UpdateAccount};
use numis_core::repository::AccountRepository;
use numis_db::SurrealAccountRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealAccountRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    numis_db::run_migrations(&db).await.unwrap();
    SurrealAccountRepository::new(db)
}

fn new_account(email: &str) -> CreateAccount {
    CreateAccount {
        email: email.into(),
        password_hash: "$argon2id$placeholder".into(),
        display_name: Some("Alice".into()),
        is_admin: false,
    }
}

#[tokio::test]
async fn create_and_get_account() {
    let repo = setup().await;

    let account = repo.create(new_account("alice@example.com")).await.unwrap();
    assert_eq!(account.email, "alice@example.com");
    assert!(!account.mfa_enabled);
    assert!(account.mfa_secret.is_none());
    assert_eq!(account.failed_login_attempts, 0);
    assert!(account.locked_until.is_none());

    let by_id = repo.get_by_id(account.id).await.unwrap();
    assert_eq!(by_id.email, account.email);
    assert_eq!(by_id.display_name.as_deref(), Some("Alice"));

    let by_email = repo.get_by_email("alice@example.com").await.unwrap();
    assert_eq!(by_email.id, account.id);
}

#[tokio::test]
async fn email_lookup_is_case_sensitive() {
    let repo = setup().await;
    repo.create(new_account("alice@example.com")).await.unwrap();

    let err = repo.get_by_email("Alice@Example.com").await.unwrap_err();
    assert!(matches!(err, NumisError::NotFound { .. }));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let repo = setup().await;
    repo.create(new_account("alice@example.com")).await.unwrap();

    let err = repo
        .create(new_account("alice@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, NumisError::AlreadyExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn get_missing_account_is_not_found() {
    let repo = setup().await;
    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, NumisError::NotFound { .. }));
}

#[tokio::test]
async fn update_sets_and_clears_mfa_fields() {
    let repo = setup().await;
    let account = repo.create(new_account("alice@example.com")).await.unwrap();

    let updated = repo
        .update(
            account.id,
            UpdateAccount {
                mfa_enabled: Some(true),
                mfa_secret: Some(Some("sealed".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.mfa_enabled);
    assert_eq!(updated.mfa_secret.as_deref(), Some("sealed"));
    assert_eq!(updated.display_name.as_deref(), Some("Alice"));

    let cleared = repo
        .update(
            account.id,
            UpdateAccount {
                mfa_enabled: Some(false),
                mfa_secret: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!cleared.mfa_enabled);
    assert!(cleared.mfa_secret.is_none());
}

#[tokio::test]
async fn update_missing_account_is_not_found() {
    let repo = setup().await;
    let err = repo
        .update(
            Uuid::new_v4(),
            UpdateAccount {
                is_admin: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NumisError::NotFound { .. }));
}

#[tokio::test]
async fn lockout_cas_applies_when_expected_matches() {
    let repo = setup().await;
    let account = repo.create(new_account("alice@example.com")).await.unwrap();

    let locked_until = Utc::now() + Duration::minutes(15);
    let next = LockoutState {
        failed_attempts: 5,
        locked_until: Some(locked_until),
    };
    let updated = repo
        .compare_and_set_lockout(account.id, LockoutState::default(), next)
        .await
        .unwrap()
        .expect("expected state matched");
    assert_eq!(updated.failed_login_attempts, 5);
    assert_eq!(updated.locked_until, Some(locked_until));

    // The stored datetime must compare equal on the next round.
    let reset = repo
        .compare_and_set_lockout(account.id, next, LockoutState::default())
        .await
        .unwrap()
        .expect("stored state round-trips exactly");
    assert_eq!(reset.lockout_state(), LockoutState::default());
}

#[tokio::test]
async fn lockout_cas_refuses_stale_expectation() {
    let repo = setup().await;
    let account = repo.create(new_account("alice@example.com")).await.unwrap();

    let stale = LockoutState {
        failed_attempts: 3,
        locked_until: None,
    };
    let next = LockoutState {
        failed_attempts: 4,
        locked_until: None,
    };
    let outcome = repo
        .compare_and_set_lockout(account.id, stale, next)
        .await
        .unwrap();
    assert!(outcome.is_none());

    let stored = repo.get_by_id(account.id).await.unwrap();
    assert_eq!(stored.failed_login_attempts, 0);
}

#[tokio::test]
async fn concurrent_failures_are_not_lost() {
    let repo = setup().await;
    let account = repo.create(new_account("alice@example.com")).await.unwrap();

    // Each task retries its increment until its compare-and-set wins.
    let mut handles = Vec::new();
    for _ in 0..4 {
        let repo = repo.clone();
        let id = account.id;
        handles.push(tokio::spawn(async move {
            loop {
                let Ok(account) = repo.get_by_id(id).await else {
                    continue;
                };
                let current = account.lockout_state();
                let next = LockoutState {
                    failed_attempts: current.failed_attempts + 1,
                    locked_until: None,
                };
                // Storage-level write conflicts count as a lost race too.
                if let Ok(Some(_)) = repo.compare_and_set_lockout(id, current, next).await {
                    break;
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = repo.get_by_id(account.id).await.unwrap();
    assert_eq!(stored.failed_login_attempts, 4);
}

#[tokio::test]
async fn mfa_secret_is_provisioned_once() {
    let repo = setup().await;
    let account = repo.create(new_account("alice@example.com")).await.unwrap();

    let first = repo
        .provision_mfa_secret(account.id, "sealed-one".into())
        .await
        .unwrap()
        .expect("first provisioning wins");
    assert_eq!(first.mfa_secret.as_deref(), Some("sealed-one"));

    let second = repo
        .provision_mfa_secret(account.id, "sealed-two".into())
        .await
        .unwrap();
    assert!(second.is_none());
    let stored = repo.get_by_id(account.id).await.unwrap();
    assert_eq!(stored.mfa_secret.as_deref(), Some("sealed-one"));

    // Clearing the secret opens provisioning again.
    repo.update(
        account.id,
        UpdateAccount {
            mfa_secret: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let again = repo
        .provision_mfa_secret(account.id, "sealed-three".into())
        .await
        .unwrap();
    assert_eq!(
        again.and_then(|a| a.mfa_secret).as_deref(),
        Some("sealed-three")
    );
}
