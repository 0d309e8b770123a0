//! Audit trail: standalone recording and the admin listing.

use std::sync::Arc;

use numis_core::clock::AuditClock;
use numis_core::error::{NumisError, NumisResult};
use numis_core::models::account::Actor;
use numis_core::models::audit::{AuditLogEntry, CreateAuditLogEntry};
use numis_core::repository::{AuditLogFilter, AuditLogRepository, PageRequest, PaginatedResult};
use tracing::{error, info};

use crate::event::AuditEvent;

/// Records audit entries and serves the filtered history.
///
/// Coin mutations do not go through [`record`](Self::record); they build
/// their entry with [`entry`](Self::entry) and commit it with the
/// mutation itself.
pub struct AuditService<L: AuditLogRepository> {
    log: L,
    clock: Arc<AuditClock>,
}

impl<L: AuditLogRepository> AuditService<L> {
    pub fn new(log: L, clock: Arc<AuditClock>) -> Self {
        Self { log, clock }
    }

    /// Stamp `event` with `actor` and the next audit timestamp.
    pub fn entry(&self, actor: &Actor, event: AuditEvent) -> NumisResult<CreateAuditLogEntry> {
        event.into_entry(actor, self.clock.now())
    }

    /// Append one entry on its own. Never drops silently: any store
    /// failure comes back as `AuditWriteFailure`.
    pub async fn record(&self, actor: &Actor, event: AuditEvent) -> NumisResult<AuditLogEntry> {
        let entry = self.entry(actor, event)?;
        let action = entry.action;
        match self.log.append(entry).await {
            Ok(written) => {
                info!(audit_id = %written.id, %action, actor_id = %actor.id, "audit entry recorded");
                Ok(written)
            }
            Err(e) => {
                error!(%action, actor_id = %actor.id, error = %e, "audit write failed");
                Err(match e {
                    NumisError::AuditWriteFailure(msg) => NumisError::AuditWriteFailure(msg),
                    other => NumisError::AuditWriteFailure(other.to_string()),
                })
            }
        }
    }

    /// Filtered history, newest first. Administrators only.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: AuditLogFilter,
        page: PageRequest,
    ) -> NumisResult<PaginatedResult<AuditLogEntry>> {
        if !actor.is_admin {
            return Err(NumisError::AuthorizationDenied {
                reason: "audit log is restricted to administrators".into(),
            });
        }
        if let (Some(from), Some(to)) = (filter.from, filter.to)
            && from > to
        {
            return Err(NumisError::Validation {
                message: "date_from must not be after date_to".into(),
            });
        }

        self.log.list(filter, page.to_pagination()).await
    }
}
