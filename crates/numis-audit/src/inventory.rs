//! Coin mutations. Each one commits exactly one audit entry per affected
//! coin in the same transaction as the change.

use std::sync::Arc;

use numis_core::clock::AuditClock;
use numis_core::error::{NumisError, NumisResult};
use numis_core::models::account::Actor;
use numis_core::models::audit::AuditLogEntry;
use numis_core::models::coin::{Coin, CoinPatch, CreateCoin};
use numis_core::repository::CoinRepository;
use tracing::{info, warn};
use uuid::Uuid;

use crate::event::AuditEvent;

pub struct InventoryService<C: CoinRepository> {
    coins: C,
    clock: Arc<AuditClock>,
}

impl<C: CoinRepository> InventoryService<C> {
    pub fn new(coins: C, clock: Arc<AuditClock>) -> Self {
        Self { coins, clock }
    }

    pub async fn get(&self, id: Uuid) -> NumisResult<Coin> {
        self.coins.get_by_id(id).await
    }

    /// Add a coin owned by `actor`.
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateCoin,
    ) -> NumisResult<(Coin, AuditLogEntry)> {
        ensure_non_negative(input.quantity)?;

        let now = self.clock.now();
        let coin = Coin::new(actor.id, input, now);
        let entry = AuditEvent::created(&coin).into_entry(actor, now)?;

        let (coin, entry) = self.coins.insert(coin, entry).await?;
        info!(coin_id = %coin.id, actor_id = %actor.id, "coin created");
        Ok((coin, entry))
    }

    /// Merge `patch` into the coin. Owner or administrator only.
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: CoinPatch,
    ) -> NumisResult<(Coin, AuditLogEntry)> {
        let current = self.coins.get_by_id(id).await?;
        authorize_owner(actor, &current)?;

        let now = self.clock.now();
        let next = current.apply_patch(patch, now);
        ensure_non_negative(next.quantity)?;

        let entry = AuditEvent::updated(&current, &next).into_entry(actor, now)?;
        let (coin, entry) = self.coins.replace(current.version, next, entry).await?;
        info!(coin_id = %coin.id, actor_id = %actor.id, "coin updated");
        Ok((coin, entry))
    }

    /// Remove the coin. Its history stays in the audit log.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> NumisResult<AuditLogEntry> {
        let current = self.coins.get_by_id(id).await?;
        authorize_owner(actor, &current)?;

        let entry = AuditEvent::deleted(&current).into_entry(actor, self.clock.now())?;
        let entry = self.coins.delete(id, current.version, entry).await?;
        info!(coin_id = %id, actor_id = %actor.id, "coin deleted");
        Ok(entry)
    }

    /// Insert a batch of coins owned by `actor`, one `import` entry each.
    /// Nothing is written if any coin is invalid or any write fails.
    pub async fn import(
        &self,
        actor: &Actor,
        inputs: Vec<CreateCoin>,
    ) -> NumisResult<Vec<(Coin, AuditLogEntry)>> {
        for input in &inputs {
            ensure_non_negative(input.quantity)?;
        }

        let mut batch = Vec::with_capacity(inputs.len());
        for input in inputs {
            let now = self.clock.now();
            let coin = Coin::new(actor.id, input, now);
            let entry = AuditEvent::imported(&coin).into_entry(actor, now)?;
            batch.push((coin, entry));
        }

        let written = self.coins.insert_many(batch).await?;
        info!(count = written.len(), actor_id = %actor.id, "coins imported");
        Ok(written)
    }

    /// Move stock in or out. Administrators only.
    ///
    /// A result below zero is rejected before anything is written.
    pub async fn adjust_quantity(
        &self,
        actor: &Actor,
        id: Uuid,
        delta: i64,
        note: Option<String>,
    ) -> NumisResult<(Coin, AuditLogEntry)> {
        if !actor.is_admin {
            return Err(NumisError::AuthorizationDenied {
                reason: "stock adjustments are restricted to administrators".into(),
            });
        }

        let current = self.coins.get_by_id(id).await?;
        let quantity = current
            .quantity
            .checked_add(delta)
            .filter(|q| *q >= 0)
            .ok_or_else(|| {
                warn!(coin_id = %id, current = current.quantity, delta, "adjustment rejected");
                NumisError::NegativeQuantity {
                    current: current.quantity,
                    delta,
                }
            })?;

        let now = self.clock.now();
        let next = current.with_quantity(quantity, now);
        let entry = AuditEvent::adjusted(&current, &next, delta)
            .with_note(note)
            .into_entry(actor, now)?;

        let (coin, entry) = self.coins.replace(current.version, next, entry).await?;
        info!(
            coin_id = %coin.id,
            actor_id = %actor.id,
            delta,
            action = %entry.action,
            "quantity adjusted"
        );
        Ok((coin, entry))
    }
}

fn ensure_non_negative(quantity: i64) -> NumisResult<()> {
    if quantity < 0 {
        return Err(NumisError::Validation {
            message: "quantity must not be negative".into(),
        });
    }
    Ok(())
}

fn authorize_owner(actor: &Actor, coin: &Coin) -> NumisResult<()> {
    if actor.is_admin || coin.owner_id == actor.id {
        Ok(())
    } else {
        Err(NumisError::AuthorizationDenied {
            reason: "only the owner or an administrator may change this coin".into(),
        })
    }
}
