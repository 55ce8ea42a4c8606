//! Shared fixture for ledger tests: an in-memory database with a small
//! catalog, one actor per role and a fixed clock.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::{FixedClock, LedgerConfig, Till};
use till_core::{Actor, Money, Role};
use till_db::{Database, DbConfig, NewCustomer, NewProduct};

pub(crate) struct Fixture {
    pub till: Till,
    pub clock: Arc<FixedClock>,
    pub admin: Actor,
    pub support: Actor,
    pub cashier: Actor,
    pub clerk: Actor,
    pub customer_id: i64,
    /// RTR-01, 10 in stock, 25,000.00 each.
    pub router_id: i64,
    /// MSE-01, 3 in stock (below the threshold of 5).
    pub mouse_id: i64,
    /// Screen replacement, 40,000.00.
    pub service_id: i64,
}

/// Whole currency units.
pub(crate) fn units(n: i64) -> Money {
    Money::from_major_minor(n, 0)
}

pub(crate) async fn fixture() -> Fixture {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let clock = Arc::new(FixedClock::at_date(
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
    ));

    let config = LedgerConfig {
        initial_cash_balance: units(100_000),
        ..LedgerConfig::default()
    };
    let till = Till::with_database(db.clone(), &config, clock.clone())
        .await
        .unwrap();

    let admin = Actor::new(1, "admin", Role::Admin);

    let customer_id = db
        .customers()
        .insert(&NewCustomer {
            full_name: "Walk-in customer".to_string(),
            document_type: "NIT".to_string(),
            document_number: "222222222222".to_string(),
        })
        .await
        .unwrap()
        .id;

    let router_id = db
        .products()
        .insert(
            &NewProduct {
                code: "RTR-01".to_string(),
                description: "Wi-Fi router".to_string(),
                quantity: 10,
                cost_price: units(15_000),
                sale_price: units(25_000),
            },
            admin.id,
        )
        .await
        .unwrap()
        .id;

    let mouse_id = db
        .products()
        .insert(
            &NewProduct {
                code: "MSE-01".to_string(),
                description: "Wireless mouse".to_string(),
                quantity: 3,
                cost_price: units(4_000),
                sale_price: units(8_000),
            },
            admin.id,
        )
        .await
        .unwrap()
        .id;

    let service_id = db
        .services()
        .insert("Screen replacement", units(40_000))
        .await
        .unwrap()
        .id;

    Fixture {
        till,
        clock,
        admin,
        support: Actor::new(2, "support", Role::Support),
        cashier: Actor::new(3, "cashier", Role::Cashier),
        clerk: Actor::new(4, "clerk", Role::Clerk),
        customer_id,
        router_id,
        mouse_id,
        service_id,
    }
}
