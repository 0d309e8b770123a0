//! Audit log domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of inventory mutation recorded by an audit entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Import,
    AdjustIn,
    AdjustOut,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Import => "import",
            AuditAction::AdjustIn => "adjust_in",
            AuditAction::AdjustOut => "adjust_out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(AuditAction::Create),
            "update" => Some(AuditAction::Update),
            "delete" => Some(AuditAction::Delete),
            "import" => Some(AuditAction::Import),
            "adjust_in" => Some(AuditAction::AdjustIn),
            "adjust_out" => Some(AuditAction::AdjustOut),
            _ => None,
        }
    }

    /// Adjustment direction for a caller-supplied delta.
    pub fn for_adjustment(delta: i64) -> Self {
        if delta > 0 {
            AuditAction::AdjustIn
        } else {
            AuditAction::AdjustOut
        }
    }

    /// Whether entries of this kind carry a `before` snapshot.
    pub fn has_before(&self) -> bool {
        match self {
            AuditAction::Create | AuditAction::Import => false,
            AuditAction::Update
            | AuditAction::Delete
            | AuditAction::AdjustIn
            | AuditAction::AdjustOut => true,
        }
    }

    /// Whether entries of this kind carry an `after` snapshot.
    pub fn has_after(&self) -> bool {
        match self {
            AuditAction::Delete => false,
            AuditAction::Create
            | AuditAction::Update
            | AuditAction::Import
            | AuditAction::AdjustIn
            | AuditAction::AdjustOut => true,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record of one mutation. Actor fields are copies taken at
/// write time, not references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub action: AuditAction,
    pub coin_id: Option<Uuid>,
    pub delta_quantity: Option<i64>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub note: Option<String>,
    pub actor_id: Option<Uuid>,
    pub actor_email: String,
    pub created_at: DateTime<Utc>,
}

/// A fully-formed entry ready to append. Ids and timestamps are assigned
/// by the caller so that the same values can be written in the same
/// transaction as the mutation they describe.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAuditLogEntry {
    pub id: Uuid,
    pub action: AuditAction,
    pub coin_id: Option<Uuid>,
    pub delta_quantity: Option<i64>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub note: Option<String>,
    pub actor_id: Option<Uuid>,
    pub actor_email: String,
    pub created_at: DateTime<Utc>,
}

impl From<CreateAuditLogEntry> for AuditLogEntry {
    fn from(input: CreateAuditLogEntry) -> Self {
        Self {
            id: input.id,
            action: input.action,
            coin_id: input.coin_id,
            delta_quantity: input.delta_quantity,
            before: input.before,
            after: input.after,
            note: input.note,
            actor_id: input.actor_id,
            actor_email: input.actor_email,
            created_at: input.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_string_roundtrip() {
        for action in [
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Delete,
            AuditAction::Import,
            AuditAction::AdjustIn,
            AuditAction::AdjustOut,
        ] {
            assert_eq!(AuditAction::parse(action.as_str()), Some(action));
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, action.as_str());
        }
        assert_eq!(AuditAction::parse("ADJUST_IN"), None);
    }

    #[test]
    fn adjustment_direction_follows_sign() {
        assert_eq!(AuditAction::for_adjustment(4), AuditAction::AdjustIn);
        assert_eq!(AuditAction::for_adjustment(-1), AuditAction::AdjustOut);
        assert_eq!(AuditAction::for_adjustment(0), AuditAction::AdjustOut);
    }
}
