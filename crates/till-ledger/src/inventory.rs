//! # Inventory Adjustment Gateway
//!
//! The only path through which product stock changes.
//!
//! ## Stock Changes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve()       sale line        quantity − n   (checked, never < 0)   │
//! │  release()       cancellation     quantity + n   (unchecked)            │
//! │  adjust_stock()  manual count     quantity ± n   (elevated, never < 0)  │
//! │                                                                         │
//! │  Each change writes the new quantity AND appends one movement on the   │
//! │  same connection, so both land or neither does.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `reserve` and `release` run on the caller's transaction and assume the
//! caller already holds the ledger's write lock.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::Shared;
use till_core::{Actor, CoreError, InventoryMovement, MovementKind, Product};
use till_db::{InventoryRepository, MovementFilter, NewMovement, ProductRepository};

/// Who moves stock, when, and why.
#[derive(Debug, Clone, Copy)]
pub struct StockContext<'a> {
    pub actor_id: i64,
    pub note: &'a str,
    pub at: DateTime<Utc>,
    /// Reservations ending at or below this level log a low-stock alert.
    pub low_stock_threshold: i64,
}

/// Manual correction of a product's stock.
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    pub product_id: i64,
    /// Signed change; must not be zero.
    pub delta: i64,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InventoryGateway {
    shared: Shared,
}

impl InventoryGateway {
    pub(crate) fn new(shared: Shared) -> Self {
        InventoryGateway { shared }
    }

    /// Takes `quantity` units of a product for a sale.
    ///
    /// The quantity is read on `conn` right before the write, so earlier
    /// reservations in the same transaction are accounted for.
    ///
    /// ## Returns
    /// * `Ok(resulting)` - stock left after the reservation
    /// * `Err(LedgerError::NotFound)` - no such product
    /// * `Err(LedgerError::InsufficientStock)` - fewer than `quantity` on hand
    pub async fn reserve(
        conn: &mut SqliteConnection,
        product_id: i64,
        quantity: i64,
        ctx: &StockContext<'_>,
    ) -> LedgerResult<i64> {
        let product = Self::load(conn, product_id).await?;

        if product.quantity < quantity {
            return Err(CoreError::InsufficientStock {
                code: product.code,
                available: product.quantity,
                requested: quantity,
            }
            .into());
        }

        let resulting = product.quantity - quantity;
        Self::write(conn, &product, -quantity, MovementKind::Sale, ctx).await?;

        if resulting <= ctx.low_stock_threshold {
            warn!(
                product_id = product.id,
                code = %product.code,
                quantity = resulting,
                threshold = ctx.low_stock_threshold,
                "Low stock"
            );
        }

        Ok(resulting)
    }

    /// Puts `quantity` units of a product back after a cancellation.
    pub async fn release(
        conn: &mut SqliteConnection,
        product_id: i64,
        quantity: i64,
        ctx: &StockContext<'_>,
    ) -> LedgerResult<i64> {
        let product = Self::load(conn, product_id).await?;
        let movement = Self::write(conn, &product, quantity, MovementKind::SaleCancellation, ctx).await?;
        Ok(movement.resulting_quantity)
    }

    /// Corrects a product's stock by a signed delta.
    ///
    /// ## Errors
    /// * `Forbidden` - actor is not admin/support
    /// * `InvalidInput` - zero delta, empty reason, or a result below zero
    /// * `NotFound` - no such product
    pub async fn adjust_stock(
        &self,
        actor: &Actor,
        adjustment: &StockAdjustment,
    ) -> LedgerResult<InventoryMovement> {
        if !actor.role.is_elevated() {
            return Err(CoreError::Forbidden {
                role: actor.role.to_string(),
                action: "adjust stock",
            }
            .into());
        }
        if adjustment.delta == 0 {
            return Err(LedgerError::invalid_input("delta must not be zero"));
        }
        till_core::validation::validate_description("reason", &adjustment.reason)?;

        let note = match adjustment.notes.as_deref().map(str::trim) {
            Some(notes) if !notes.is_empty() => {
                format!("{}: {}", adjustment.reason.trim(), notes)
            }
            _ => adjustment.reason.trim().to_string(),
        };

        let _guard = self.shared.lock.write().await;
        let settings = self.shared.db.settings().get().await?;
        let now = self.shared.clock.now();

        let mut tx = self.shared.db.begin().await?;
        let product = Self::load(&mut tx, adjustment.product_id).await?;

        let resulting = stock_after(&product, adjustment.delta)?;
        if resulting < 0 {
            return Err(LedgerError::invalid_input(format!(
                "adjustment would leave {} at {} units",
                product.code, resulting
            )));
        }

        let ctx = StockContext {
            actor_id: actor.id,
            note: &note,
            at: now,
            low_stock_threshold: settings.low_stock_threshold,
        };
        let movement = Self::write(&mut tx, &product, adjustment.delta, MovementKind::Adjustment, &ctx).await?;
        tx.commit().await.map_err(till_db::DbError::from)?;

        info!(
            product_id = product.id,
            code = %product.code,
            delta = adjustment.delta,
            quantity = resulting,
            actor = %actor.username,
            "Stock adjusted"
        );

        Ok(movement)
    }

    /// Movement history, newest first.
    pub async fn movements(&self, filter: &MovementFilter) -> LedgerResult<Vec<InventoryMovement>> {
        let _guard = self.shared.lock.read().await;
        Ok(self.shared.db.inventory().list(filter).await?)
    }

    /// Active products at or below the store's low-stock threshold.
    pub async fn low_stock(&self) -> LedgerResult<Vec<Product>> {
        let _guard = self.shared.lock.read().await;
        let settings = self.shared.db.settings().get().await?;
        Ok(self
            .shared
            .db
            .products()
            .low_stock(settings.low_stock_threshold)
            .await?)
    }

    async fn load(conn: &mut SqliteConnection, product_id: i64) -> LedgerResult<Product> {
        ProductRepository::fetch(conn, product_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product", product_id))
    }

    async fn write(
        conn: &mut SqliteConnection,
        product: &Product,
        delta: i64,
        kind: MovementKind,
        ctx: &StockContext<'_>,
    ) -> LedgerResult<InventoryMovement> {
        let resulting = stock_after(product, delta)?;
        ProductRepository::set_quantity(conn, product.id, resulting, ctx.at).await?;

        let new = NewMovement {
            product_id: product.id,
            product_code: product.code.clone(),
            quantity_delta: delta,
            resulting_quantity: resulting,
            kind,
            actor_id: ctx.actor_id,
            note: Some(ctx.note.to_string()),
            created_at: ctx.at,
        };
        let id = InventoryRepository::append(conn, &new).await?;

        Ok(InventoryMovement {
            id,
            product_id: new.product_id,
            product_code: new.product_code,
            quantity_delta: new.quantity_delta,
            resulting_quantity: new.resulting_quantity,
            kind: new.kind,
            actor_id: new.actor_id,
            note: new.note,
            created_at: new.created_at,
        })
    }
}

fn stock_after(product: &Product, delta: i64) -> LedgerResult<i64> {
    product.quantity.checked_add(delta).ok_or_else(|| {
        LedgerError::invalid_input(format!("stock of {} out of range", product.code))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::test_support::fixture;

    fn adjustment(product_id: i64, delta: i64) -> StockAdjustment {
        StockAdjustment {
            product_id,
            delta,
            reason: "Physical count".to_string(),
            notes: Some("shelf B".to_string()),
        }
    }

    #[tokio::test]
    async fn test_adjust_stock_records_movement() {
        let fx = fixture().await;
        let gateway = fx.till.inventory();

        let movement = gateway
            .adjust_stock(&fx.admin, &adjustment(fx.router_id, -2))
            .await
            .unwrap();
        assert_eq!(movement.kind, MovementKind::Adjustment);
        assert_eq!(movement.quantity_delta, -2);
        assert_eq!(movement.resulting_quantity, 8);
        assert_eq!(movement.note.as_deref(), Some("Physical count: shelf B"));

        let product = fx.till.database().products().get_by_id(fx.router_id).await.unwrap().unwrap();
        assert_eq!(product.quantity, 8);

        let history = gateway
            .movements(&MovementFilter {
                product_id: Some(fx.router_id),
                kind: Some(MovementKind::Adjustment),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, movement.id);
    }

    #[tokio::test]
    async fn test_adjust_stock_rules() {
        let fx = fixture().await;
        let gateway = fx.till.inventory();

        let err = gateway
            .adjust_stock(&fx.cashier, &adjustment(fx.router_id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        let err = gateway
            .adjust_stock(&fx.admin, &adjustment(fx.router_id, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = gateway
            .adjust_stock(&fx.admin, &adjustment(fx.router_id, -11))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = gateway
            .adjust_stock(&fx.admin, &adjustment(fx.router_id, i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = gateway
            .adjust_stock(&fx.support, &adjustment(9_999, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reserve_and_release_on_one_transaction() {
        let fx = fixture().await;
        let ctx = StockContext {
            actor_id: fx.cashier.id,
            note: "test",
            at: fx.clock.now(),
            low_stock_threshold: 5,
        };

        let mut tx = fx.till.database().begin().await.unwrap();
        assert_eq!(InventoryGateway::reserve(&mut tx, fx.router_id, 4, &ctx).await.unwrap(), 6);
        assert_eq!(InventoryGateway::reserve(&mut tx, fx.router_id, 6, &ctx).await.unwrap(), 0);

        let err = InventoryGateway::reserve(&mut tx, fx.router_id, 1, &ctx).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { available: 0, requested: 1, .. }));

        assert_eq!(InventoryGateway::release(&mut tx, fx.router_id, 3, &ctx).await.unwrap(), 3);
        tx.commit().await.unwrap();

        let movements = fx
            .till
            .inventory()
            .movements(&MovementFilter {
                product_id: Some(fx.router_id),
                ..Default::default()
            })
            .await
            .unwrap();
        // creation + 2 reservations + 1 release
        assert_eq!(movements.len(), 4);
    }

    #[tokio::test]
    async fn test_low_stock_uses_store_threshold() {
        let fx = fixture().await;
        let low = fx.till.inventory().low_stock().await.unwrap();
        let codes: Vec<_> = low.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["MSE-01"]);
    }
}
