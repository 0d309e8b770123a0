//! Numis Audit: the append-only audit trail and the coin mutations
//! that feed it.

pub mod event;
pub mod inventory;
pub mod service;

pub use event::AuditEvent;
pub use inventory::InventoryService;
pub use service::AuditService;
