//! Audit events: what happened, before it is stamped with an actor and time.

use chrono::{DateTime, Utc};
use numis_core::error::{NumisError, NumisResult};
use numis_core::models::account::Actor;
use numis_core::models::audit::{AuditAction, CreateAuditLogEntry};
use numis_core::models::coin::Coin;
use serde_json::Value;
use uuid::Uuid;

/// One mutation to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub coin_id: Option<Uuid>,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub delta_quantity: Option<i64>,
    pub note: Option<String>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, coin_id: Option<Uuid>) -> Self {
        Self {
            action,
            coin_id,
            before: None,
            after: None,
            delta_quantity: None,
            note: None,
        }
    }

    pub fn created(coin: &Coin) -> Self {
        Self {
            after: Some(coin.snapshot()),
            delta_quantity: Some(coin.quantity),
            ..Self::new(AuditAction::Create, Some(coin.id))
        }
    }

    pub fn imported(coin: &Coin) -> Self {
        Self {
            action: AuditAction::Import,
            ..Self::created(coin)
        }
    }

    /// Quantity delta is only recorded when the quantity moved.
    pub fn updated(before: &Coin, after: &Coin) -> Self {
        let delta = after.quantity - before.quantity;
        Self {
            before: Some(before.snapshot()),
            after: Some(after.snapshot()),
            delta_quantity: (delta != 0).then_some(delta),
            ..Self::new(AuditAction::Update, Some(after.id))
        }
    }

    pub fn deleted(coin: &Coin) -> Self {
        Self {
            before: Some(coin.snapshot()),
            delta_quantity: Some(-coin.quantity),
            ..Self::new(AuditAction::Delete, Some(coin.id))
        }
    }

    /// `adjust_in` for a positive delta, `adjust_out` otherwise.
    pub fn adjusted(before: &Coin, after: &Coin, delta: i64) -> Self {
        Self {
            before: Some(before.snapshot()),
            after: Some(after.snapshot()),
            delta_quantity: Some(delta),
            ..Self::new(AuditAction::for_adjustment(delta), Some(after.id))
        }
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.trim().is_empty());
        self
    }

    /// Stamp the event with the acting account and a timestamp.
    ///
    /// Rejects events whose snapshots do not fit the action.
    pub fn into_entry(
        self,
        actor: &Actor,
        created_at: DateTime<Utc>,
    ) -> NumisResult<CreateAuditLogEntry> {
        if self.action.has_before() != self.before.is_some() {
            return Err(snapshot_mismatch(self.action, "before", self.action.has_before()));
        }
        if self.action.has_after() != self.after.is_some() {
            return Err(snapshot_mismatch(self.action, "after", self.action.has_after()));
        }

        Ok(CreateAuditLogEntry {
            id: Uuid::new_v4(),
            action: self.action,
            coin_id: self.coin_id,
            delta_quantity: self.delta_quantity,
            before: self.before,
            after: self.after,
            note: self.note,
            actor_id: Some(actor.id),
            actor_email: actor.email.clone(),
            created_at,
        })
    }
}

fn snapshot_mismatch(action: AuditAction, which: &str, required: bool) -> NumisError {
    let verb = if required { "must" } else { "must not" };
    NumisError::Validation {
        message: format!("`{action}` entries {verb} carry a {which} snapshot"),
    }
}
