//! # Sale Ledger
//!
//! Turns a sale request into an immutable invoice and moves stock with it.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        create_sale(request, actor)                      │
//! │                                                                         │
//! │  write lock ───────────────────────────────────────────────────────┐   │
//! │  │ 1. validate request (lines, quantities, discount)               │   │
//! │  │ 2. resolve customer + lines from the catalog (snapshots)        │   │
//! │  │ 3. price()  subtotal → discount → tax → total                   │   │
//! │  │ 4. issue invoice number (own statement; a later failure leaves  │   │
//! │  │    a gap, never a reuse)                                        │   │
//! │  │ 5. BEGIN                                                        │   │
//! │  │      reserve() every product line ── any failure ──► ROLLBACK   │   │
//! │  │      insert sale + items                                        │   │
//! │  │    COMMIT                                                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancel Flow
//! Elevated actors only. Every product line is released in its own
//! savepoint; a line that cannot be released is logged and skipped so the
//! cancellation itself still goes through.

use serde::{Deserialize, Serialize};
use sqlx::Connection;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult};
use crate::inventory::{InventoryGateway, StockContext};
use crate::Shared;
use till_core::validation::{
    validate_cancel_reason, validate_description, validate_line_count, validate_non_negative,
    validate_quantity,
};
use till_core::{
    price, Actor, Cancellation, CoreError, DiscountSpec, ItemKind, Money, PaymentMethod, Sale,
    SaleItem, SaleStatus, StoreSettings, TaxPolicy,
};
use till_db::{DbError, NewSale, SaleFilter, SaleRepository};

/// Prefix stored in front of every ad-hoc line description.
pub const AD_HOC_PREFIX: &str = "Ad-hoc service: ";

// =============================================================================
// Requests
// =============================================================================

/// One requested line. The `kind` tag selects the variant; an unknown kind
/// fails deserialization.
///
/// ```json
/// { "kind": "product", "product_id": 4, "quantity": 2 }
/// { "kind": "ad_hoc_service", "description": "Data recovery", "unit_price": 1500000, "quantity": 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaleLineRequest {
    Product { product_id: i64, quantity: i64 },
    CatalogService { service_id: i64, quantity: i64 },
    AdHocService {
        description: String,
        unit_price: Money,
        quantity: i64,
    },
}

impl SaleLineRequest {
    fn quantity(&self) -> i64 {
        match self {
            SaleLineRequest::Product { quantity, .. }
            | SaleLineRequest::CatalogService { quantity, .. }
            | SaleLineRequest::AdHocService { quantity, .. } => *quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequest {
    pub customer_id: i64,
    pub items: Vec<SaleLineRequest>,
    /// Any casing; the legacy names (`efectivo`, `tarjeta`, `transferencia`)
    /// are accepted too.
    #[serde(default, deserialize_with = "PaymentMethod::deserialize_lenient")]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub discount: DiscountSpec,
    /// `None` follows the store's tax-by-default setting.
    #[serde(default)]
    pub apply_tax: Option<bool>,
}

impl SaleRequest {
    /// Parses a JSON request, reporting unknown kinds or methods as
    /// invalid input.
    pub fn from_json(json: &str) -> LedgerResult<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::invalid_input(e.to_string()))
    }

    fn validate(&self, actor: &Actor) -> LedgerResult<()> {
        validate_line_count(self.items.len())?;
        self.discount.validate()?;

        for line in &self.items {
            validate_quantity(line.quantity())?;

            if let SaleLineRequest::AdHocService {
                description,
                unit_price,
                ..
            } = line
            {
                if !actor.role.can_bill_ad_hoc() {
                    return Err(CoreError::Forbidden {
                        role: actor.role.to_string(),
                        action: "bill ad-hoc services",
                    }
                    .into());
                }
                validate_description("description", description)?;
                validate_non_negative("unit_price", *unit_price)?;
            }
        }

        Ok(())
    }
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Debug, Clone)]
pub struct SaleLedger {
    shared: Shared,
}

impl SaleLedger {
    pub(crate) fn new(shared: Shared) -> Self {
        SaleLedger { shared }
    }

    /// Records a sale and reserves its stock.
    ///
    /// ## Errors
    /// * `InvalidInput` - empty request, bad quantity, invalid discount
    /// * `Forbidden` - ad-hoc line billed by a clerk
    /// * `NotFound` - unknown or inactive customer, product or service
    /// * `InsufficientStock` - a product cannot cover its lines; nothing is written
    pub async fn create_sale(&self, request: &SaleRequest, actor: &Actor) -> LedgerResult<Sale> {
        request.validate(actor)?;

        let _guard = self.shared.lock.write().await;
        let db = &self.shared.db;

        let settings = db.settings().get().await?;

        let customer = db
            .customers()
            .get_by_id(request.customer_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| LedgerError::not_found("Customer", request.customer_id))?;

        let items = self.resolve_lines(&request.items).await?;
        let pricing = price(&items, &request.discount, tax_policy(request, &settings))?;

        let invoice_number = db.settings().issue_invoice_number().await?;
        let now = self.shared.clock.now();
        let business_date = self.shared.clock.today();

        let note = format!("Sale {}", invoice_number);
        let ctx = StockContext {
            actor_id: actor.id,
            note: &note,
            at: now,
            low_stock_threshold: settings.low_stock_threshold,
        };

        let mut tx = db.begin().await?;
        for item in items.iter().filter(|i| i.is_stock_tracked()) {
            InventoryGateway::reserve(&mut tx, item.source_id, item.quantity, &ctx).await?;
        }

        let sale = SaleRepository::insert(
            &mut tx,
            &NewSale {
                invoice_number,
                created_at: now,
                business_date,
                customer_id: customer.id,
                customer_name: customer.full_name,
                customer_document: customer.document_number,
                items,
                subtotal: pricing.subtotal,
                discount: pricing.discount,
                discount_percentage: pricing.discount_percentage,
                tax_applied: pricing.tax_applied,
                tax_rate: pricing.tax_rate,
                tax_amount: pricing.tax_amount,
                total: pricing.total,
                payment_method: request.payment_method,
                created_by: actor.id,
                created_by_username: actor.username.clone(),
            },
        )
        .await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = sale.id,
            invoice_number = %sale.invoice_number,
            total = %sale.total,
            method = %sale.payment_method,
            actor = %actor.username,
            "Sale recorded"
        );

        Ok(sale)
    }

    /// Cancels a completed sale and returns its products to stock.
    ///
    /// ## Errors
    /// * `Forbidden` - actor is not admin/support
    /// * `InvalidInput` - reason shorter than 5 characters
    /// * `NotFound` - no such sale
    /// * `InvalidState` - the sale is already cancelled
    pub async fn cancel_sale(&self, sale_id: i64, reason: &str, actor: &Actor) -> LedgerResult<Sale> {
        if !actor.role.is_elevated() {
            return Err(CoreError::Forbidden {
                role: actor.role.to_string(),
                action: "cancel sales",
            }
            .into());
        }
        validate_cancel_reason(reason)?;

        let _guard = self.shared.lock.write().await;
        let settings = self.shared.db.settings().get().await?;
        let now = self.shared.clock.now();

        let mut tx = self.shared.db.begin().await?;
        let sale = SaleRepository::fetch(&mut tx, sale_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", sale_id))?;

        if sale.status == SaleStatus::Cancelled {
            return Err(CoreError::InvalidState {
                entity: "Sale",
                id: sale.invoice_number,
                status: sale.status.to_string(),
                action: "cancel",
            }
            .into());
        }

        let note = format!("Cancellation of {}", sale.invoice_number);
        let ctx = StockContext {
            actor_id: actor.id,
            note: &note,
            at: now,
            low_stock_threshold: settings.low_stock_threshold,
        };

        for item in sale.items.iter().filter(|i| i.is_stock_tracked()) {
            let mut savepoint = Connection::begin(&mut *tx).await.map_err(DbError::from)?;
            match InventoryGateway::release(&mut savepoint, item.source_id, item.quantity, &ctx).await {
                Ok(resulting) => {
                    savepoint.commit().await.map_err(DbError::from)?;
                    debug!(product_id = item.source_id, quantity = resulting, "Stock released");
                }
                Err(e) => {
                    savepoint.rollback().await.map_err(DbError::from)?;
                    warn!(
                        sale_id = sale.id,
                        product_id = item.source_id,
                        quantity = item.quantity,
                        error = %e,
                        "Could not release stock, skipping line"
                    );
                }
            }
        }

        let cancellation = Cancellation {
            reason: reason.trim().to_string(),
            cancelled_by: actor.id,
            cancelled_at: now,
        };
        SaleRepository::mark_cancelled(&mut tx, sale.id, &cancellation).await?;

        let cancelled = SaleRepository::fetch(&mut tx, sale.id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", sale.id))?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = cancelled.id,
            invoice_number = %cancelled.invoice_number,
            actor = %actor.username,
            "Sale cancelled"
        );

        Ok(cancelled)
    }

    pub async fn get_sale(&self, sale_id: i64) -> LedgerResult<Sale> {
        let _guard = self.shared.lock.read().await;
        self.shared
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", sale_id))
    }

    /// Sale history, newest first.
    pub async fn list_sales(&self, filter: &SaleFilter) -> LedgerResult<Vec<Sale>> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(LedgerError::invalid_input("start_date is after end_date"));
            }
        }

        let _guard = self.shared.lock.read().await;
        Ok(self.shared.db.sales().list(filter).await?)
    }

    /// Snapshots every requested line from the catalog.
    ///
    /// Product lines are also checked against stock here, summed per
    /// product, so an obviously short sale is rejected before an invoice
    /// number is spent.
    async fn resolve_lines(&self, lines: &[SaleLineRequest]) -> LedgerResult<Vec<SaleItem>> {
        let db = &self.shared.db;
        let mut items = Vec::with_capacity(lines.len());
        let mut requested: BTreeMap<i64, i64> = BTreeMap::new();

        for line in lines {
            let item = match line {
                SaleLineRequest::Product {
                    product_id,
                    quantity,
                } => {
                    let product = db
                        .products()
                        .get_by_id(*product_id)
                        .await?
                        .filter(|p| p.is_active)
                        .ok_or_else(|| LedgerError::not_found("Product", product_id))?;

                    let total = requested.entry(product.id).or_insert(0);
                    *total += quantity;
                    if !product.can_sell(*total) {
                        return Err(CoreError::InsufficientStock {
                            code: product.code,
                            available: product.quantity,
                            requested: *total,
                        }
                        .into());
                    }

                    SaleItem::new(
                        product.id,
                        ItemKind::Product,
                        *quantity,
                        product.sale_price,
                        product.description,
                    )?
                }
                SaleLineRequest::CatalogService {
                    service_id,
                    quantity,
                } => {
                    let service = db
                        .services()
                        .get_by_id(*service_id)
                        .await?
                        .filter(|s| s.is_active)
                        .ok_or_else(|| LedgerError::not_found("Service", service_id))?;

                    SaleItem::new(
                        service.id,
                        ItemKind::CatalogService,
                        *quantity,
                        service.value,
                        service.description,
                    )?
                }
                SaleLineRequest::AdHocService {
                    description,
                    unit_price,
                    quantity,
                } => SaleItem::new(
                    0,
                    ItemKind::AdHocService,
                    *quantity,
                    *unit_price,
                    format!("{}{}", AD_HOC_PREFIX, description.trim()),
                )?,
            };
            items.push(item);
        }

        Ok(items)
    }
}

fn tax_policy(request: &SaleRequest, settings: &StoreSettings) -> TaxPolicy {
    if request.apply_tax.unwrap_or(settings.apply_tax_by_default) {
        TaxPolicy::charged(settings.tax_rate)
    } else {
        TaxPolicy::exempt()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::test_support::{fixture, units, Fixture};
    use till_core::{MovementKind, Rate};
    use till_db::MovementFilter;

    fn product_line(product_id: i64, quantity: i64) -> SaleLineRequest {
        SaleLineRequest::Product {
            product_id,
            quantity,
        }
    }

    fn request(fx: &Fixture, items: Vec<SaleLineRequest>) -> SaleRequest {
        SaleRequest {
            customer_id: fx.customer_id,
            items,
            payment_method: PaymentMethod::Cash,
            discount: DiscountSpec::none(),
            apply_tax: None,
        }
    }

    async fn stock(fx: &Fixture, product_id: i64) -> i64 {
        fx.till
            .database()
            .products()
            .get_by_id(product_id)
            .await
            .unwrap()
            .unwrap()
            .quantity
    }

    #[tokio::test]
    async fn test_percentage_discount_without_tax() {
        let fx = fixture().await;
        let mut req = request(&fx, vec![product_line(fx.router_id, 2)]);
        req.discount = DiscountSpec::percentage(Rate::from_bps(1_000));

        let sale = fx.till.sales().create_sale(&req, &fx.cashier).await.unwrap();

        assert_eq!(sale.invoice_number, "INV-1");
        assert_eq!(sale.subtotal, units(50_000));
        assert_eq!(sale.discount, units(5_000));
        assert_eq!(sale.discount_percentage, Some(Rate::from_bps(1_000)));
        assert!(!sale.tax_applied);
        assert_eq!(sale.tax_rate, None);
        assert_eq!(sale.total, units(45_000));
        assert_eq!(sale.status, SaleStatus::Completed);
        assert_eq!(sale.business_date, fx.clock.today());
        assert_eq!(sale.customer_name, "Walk-in customer");
        assert_eq!(stock(&fx, fx.router_id).await, 8);
    }

    #[tokio::test]
    async fn test_fixed_discount_is_capped_at_subtotal() {
        let fx = fixture().await;
        let mut req = request(&fx, vec![product_line(fx.router_id, 2)]);
        req.discount = DiscountSpec {
            fixed: Some(units(60_000)),
            percentage: Some(Rate::from_bps(1_000)),
        };

        let sale = fx.till.sales().create_sale(&req, &fx.cashier).await.unwrap();
        assert_eq!(sale.discount, units(50_000));
        assert_eq!(sale.discount_percentage, None);
        assert_eq!(sale.total, Money::zero());
    }

    #[tokio::test]
    async fn test_tax_follows_request_then_store_default() {
        let fx = fixture().await;
        let mut req = request(&fx, vec![product_line(fx.router_id, 1)]);
        req.apply_tax = Some(true);

        let sale = fx.till.sales().create_sale(&req, &fx.cashier).await.unwrap();
        assert!(sale.tax_applied);
        assert_eq!(sale.tax_rate, Some(Rate::from_bps(1_900)));
        assert_eq!(sale.tax_amount, units(4_750));
        assert_eq!(sale.total, units(29_750));

        // Store default is "no tax"
        req.apply_tax = None;
        let sale = fx.till.sales().create_sale(&req, &fx.cashier).await.unwrap();
        assert!(!sale.tax_applied);
        assert_eq!(sale.total, units(25_000));
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let fx = fixture().await;
        let req = request(&fx, vec![product_line(fx.mouse_id, 5)]);

        let err = fx.till.sales().create_sale(&req, &fx.cashier).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock { available: 3, requested: 5, .. }
        ));

        assert_eq!(stock(&fx, fx.mouse_id).await, 3);
        assert!(fx.till.sales().list_sales(&SaleFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lines_of_the_same_product_are_checked_together() {
        let fx = fixture().await;
        let req = request(
            &fx,
            vec![product_line(fx.mouse_id, 2), product_line(fx.mouse_id, 2)],
        );

        let err = fx.till.sales().create_sale(&req, &fx.cashier).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { requested: 4, .. }));
        assert_eq!(stock(&fx, fx.mouse_id).await, 3);
    }

    #[tokio::test]
    async fn test_mixed_lines_snapshot_catalog() {
        let fx = fixture().await;
        let req = request(
            &fx,
            vec![
                product_line(fx.router_id, 1),
                SaleLineRequest::CatalogService {
                    service_id: fx.service_id,
                    quantity: 1,
                },
                SaleLineRequest::AdHocService {
                    description: "  Cable crimping ".to_string(),
                    unit_price: units(1_000),
                    quantity: 3,
                },
            ],
        );

        let sale = fx.till.sales().create_sale(&req, &fx.cashier).await.unwrap();
        assert_eq!(sale.items.len(), 3);
        assert_eq!(sale.items[1].kind, ItemKind::CatalogService);
        assert_eq!(sale.items[2].source_id, 0);
        assert_eq!(sale.items[2].description, "Ad-hoc service: Cable crimping");
        assert_eq!(sale.items[2].line_total, units(3_000));
        assert_eq!(sale.subtotal, units(25_000 + 40_000 + 3_000));
    }

    #[tokio::test]
    async fn test_request_validation() {
        let fx = fixture().await;
        let sales = fx.till.sales();

        let err = sales.create_sale(&request(&fx, vec![]), &fx.cashier).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = sales
            .create_sale(&request(&fx, vec![product_line(fx.router_id, 0)]), &fx.cashier)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let mut req = request(&fx, vec![product_line(fx.router_id, 1)]);
        req.discount = DiscountSpec::percentage(Rate::from_bps(10_001));
        let err = sales.create_sale(&req, &fx.cashier).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let mut req = request(&fx, vec![product_line(fx.router_id, 1)]);
        req.customer_id = 999;
        let err = sales.create_sale(&req, &fx.cashier).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));

        let ad_hoc = SaleLineRequest::AdHocService {
            description: "Cleaning".to_string(),
            unit_price: units(10),
            quantity: 1,
        };
        let err = sales
            .create_sale(&request(&fx, vec![ad_hoc]), &fx.clerk)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        let oversized = SaleLineRequest::AdHocService {
            description: "Fleet contract".to_string(),
            unit_price: Money::from_cents(i64::MAX / 2),
            quantity: 3,
        };
        let err = sales
            .create_sale(&request(&fx, vec![oversized]), &fx.cashier)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        // None of the rejected requests spent an invoice number
        let sale = sales
            .create_sale(&request(&fx, vec![product_line(fx.router_id, 1)]), &fx.clerk)
            .await
            .unwrap();
        assert_eq!(sale.invoice_number, "INV-1");
    }

    #[test]
    fn test_request_json_parsing() {
        let err = SaleRequest::from_json(
            r#"{"customer_id": 1, "items": [{"kind": "gift_card", "quantity": 1}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let req = SaleRequest::from_json(
            r#"{"customer_id": 1, "payment_method": "Tarjeta",
                "items": [{"kind": "product", "product_id": 4, "quantity": 2}]}"#,
        )
        .unwrap();
        assert_eq!(req.payment_method, PaymentMethod::Card);
        assert_eq!(req.items, vec![product_line(4, 2)]);

        let req = SaleRequest::from_json(
            r#"{"customer_id": 1, "items": [{"kind": "product", "product_id": 4, "quantity": 1}]}"#,
        )
        .unwrap();
        assert_eq!(req.payment_method, PaymentMethod::Cash);

        let err = SaleRequest::from_json(
            r#"{"customer_id": 1, "payment_method": "cheque",
                "items": [{"kind": "product", "product_id": 4, "quantity": 1}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        let fx = fixture().await;
        let sale = fx
            .till
            .sales()
            .create_sale(&request(&fx, vec![product_line(fx.router_id, 3)]), &fx.cashier)
            .await
            .unwrap();
        assert_eq!(stock(&fx, fx.router_id).await, 7);

        let cancelled = fx
            .till
            .sales()
            .cancel_sale(sale.id, "Customer returned it", &fx.admin)
            .await
            .unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        let cancellation = cancelled.cancellation.unwrap();
        assert_eq!(cancellation.cancelled_by, fx.admin.id);
        assert_eq!(cancellation.reason, "Customer returned it");
        assert_eq!(stock(&fx, fx.router_id).await, 10);

        let err = fx
            .till
            .sales()
            .cancel_sale(sale.id, "Customer returned it", &fx.admin)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)));
        assert_eq!(stock(&fx, fx.router_id).await, 10);

        let releases = fx
            .till
            .inventory()
            .movements(&MovementFilter {
                product_id: Some(fx.router_id),
                kind: Some(MovementKind::SaleCancellation),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].quantity_delta, 3);
    }

    #[tokio::test]
    async fn test_cancel_skips_a_line_that_cannot_be_released() {
        let fx = fixture().await;
        let sale = fx
            .till
            .sales()
            .create_sale(
                &request(&fx, vec![product_line(fx.router_id, 2), product_line(fx.mouse_id, 1)]),
                &fx.cashier,
            )
            .await
            .unwrap();

        // Putting the router back would overflow its stock
        sqlx::query("UPDATE products SET quantity = ?1 WHERE id = ?2")
            .bind(i64::MAX)
            .bind(fx.router_id)
            .execute(fx.till.database().pool())
            .await
            .unwrap();

        let cancelled = fx
            .till
            .sales()
            .cancel_sale(sale.id, "Customer returned it", &fx.admin)
            .await
            .unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(
            fx.till.sales().get_sale(sale.id).await.unwrap().status,
            SaleStatus::Cancelled
        );

        assert_eq!(stock(&fx, fx.router_id).await, i64::MAX);
        assert_eq!(stock(&fx, fx.mouse_id).await, 3);

        let releases = fx
            .till
            .inventory()
            .movements(&MovementFilter {
                kind: Some(MovementKind::SaleCancellation),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].product_id, fx.mouse_id);
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let fx = fixture().await;
        let sale = fx
            .till
            .sales()
            .create_sale(&request(&fx, vec![product_line(fx.router_id, 1)]), &fx.cashier)
            .await
            .unwrap();

        let err = fx
            .till
            .sales()
            .cancel_sale(sale.id, "Wrong item", &fx.cashier)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        let err = fx
            .till
            .sales()
            .cancel_sale(sale.id, "oops", &fx.support)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let err = fx
            .till
            .sales()
            .cancel_sale(999, "Wrong item", &fx.support)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let fx = fixture().await;
        let sales = fx.till.sales();

        let first = sales
            .create_sale(&request(&fx, vec![product_line(fx.router_id, 1)]), &fx.cashier)
            .await
            .unwrap();
        let mut req = request(
            &fx,
            vec![SaleLineRequest::CatalogService {
                service_id: fx.service_id,
                quantity: 1,
            }],
        );
        req.payment_method = PaymentMethod::Transfer;
        let second = sales.create_sale(&req, &fx.cashier).await.unwrap();

        assert_eq!(sales.get_sale(first.id).await.unwrap(), first);
        assert!(matches!(
            sales.get_sale(999).await.unwrap_err(),
            LedgerError::NotFound { .. }
        ));

        let with_router = sales
            .list_sales(&SaleFilter {
                product_id: Some(fx.router_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(with_router, vec![first.clone()]);

        let today = fx.clock.today();
        let all_today = sales
            .list_sales(&SaleFilter {
                start_date: Some(today),
                end_date: Some(today),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all_today.len(), 2);
        assert_eq!(all_today[0].id, second.id);

        let err = sales
            .list_sales(&SaleFilter {
                start_date: today.succ_opt(),
                end_date: Some(today),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }
}
