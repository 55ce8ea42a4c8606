//! # Seed Data Generator
//!
//! Populates a database with store settings and a small catalog for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed ./till_dev.db
//! cargo run -p till-db --bin seed
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//! ```
//!
//! ## Generated Data
//! - Store settings (prefix `INV-`, 19% tax available, 100,000.00 float)
//! - A walk-in customer plus a few named ones
//! - Products: `{CATEGORY}-{INDEX}` codes with varied stock, some already low
//! - Catalog services (repairs, installs)

use std::env;
use till_core::{Money, Rate, StoreSettings};
use till_db::{Database, DbConfig, NewCustomer, NewProduct};

/// Seeding actor recorded on the creation movements.
const SEED_ACTOR_ID: i64 = 1;

/// Product families: (code prefix, names).
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "CBL",
        &["USB-C Cable 1m", "USB-C Cable 2m", "HDMI Cable 1.5m", "Lightning Cable 1m"],
    ),
    (
        "ACC",
        &["Wireless Mouse", "Keyboard", "Phone Case", "Screen Protector", "Power Bank 10000mAh"],
    ),
    (
        "AUD",
        &["Earbuds", "Over-ear Headphones", "Bluetooth Speaker"],
    ),
    ("STO", &["USB Drive 64GB", "microSD 128GB", "External SSD 1TB"]),
];

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Walk-in customer", "NIT", "222222222222"),
    ("Ana Torres", "CC", "1020304050"),
    ("Luis Gómez", "CC", "79888777"),
    ("Acme Repairs SAS", "NIT", "900123456"),
];

const SERVICES: &[(&str, i64)] = &[
    ("Screen replacement", 12_000_000),
    ("Battery replacement", 8_000_000),
    ("Software install", 3_500_000),
    ("Diagnostics", 2_000_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Till Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let settings = db
        .settings()
        .ensure_defaults(&StoreSettings {
            tax_rate: Rate::from_bps(1900),
            initial_cash_balance: Money::from_cents(10_000_000),
            ..StoreSettings::default()
        })
        .await?;
    println!(
        "✓ Settings: '{}' (next invoice {}{})",
        settings.store_name, settings.invoice_prefix, settings.next_invoice_number
    );

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for (name, doc_type, doc_number) in CUSTOMERS {
        db.customers()
            .insert(&NewCustomer {
                full_name: name.to_string(),
                document_type: doc_type.to_string(),
                document_number: doc_number.to_string(),
            })
            .await?;
    }
    println!("✓ {} customers", CUSTOMERS.len());

    let mut generated = 0;
    for (category_idx, (prefix, names)) in CATEGORIES.iter().enumerate() {
        for (idx, name) in names.iter().enumerate() {
            let product = generate_product(prefix, name, category_idx * 10 + idx);
            if let Err(e) = db.products().insert(&product, SEED_ACTOR_ID).await {
                eprintln!("Failed to insert {}: {}", product.code, e);
                continue;
            }
            generated += 1;
        }
    }
    println!("✓ {} products", generated);

    for (description, cents) in SERVICES {
        db.services()
            .insert(description, Money::from_cents(*cents))
            .await?;
    }
    println!("✓ {} services", SERVICES.len());

    let low = db.products().low_stock(settings.low_stock_threshold).await?;
    println!();
    println!("Low stock (≤ {}): {} products", settings.low_stock_threshold, low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one product with deterministic price and stock.
fn generate_product(prefix: &str, name: &str, seed: usize) -> NewProduct {
    // 10,000.00 - 89,000.00 in whole thousands
    let sale_cents = (10 + (seed * 7) % 80) as i64 * 100_000;
    // Cost at 55-74% of price
    let cost_cents = sale_cents * (55 + (seed % 20) as i64) / 100;

    NewProduct {
        code: format!("{}-{:03}", prefix, seed),
        description: name.to_string(),
        quantity: ((seed * 13) % 40) as i64,
        cost_price: Money::from_cents(cost_cents),
        sale_price: Money::from_cents(sale_cents),
    }
}
