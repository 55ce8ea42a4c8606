//! # Ledger Configuration
//!
//! Startup configuration for a [`Till`](crate::Till).
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TILL_*`)
//! 2. Defaults (this file)
//!
//! The store fields only seed the `store_settings` row the first time a
//! database is opened. From then on the stored row is authoritative.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use till_core::{Money, Rate, StoreSettings};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database file.
    /// Default: `till.db`
    pub db_path: PathBuf,

    /// Store name.
    /// Default: "Till Store"
    pub store_name: String,

    /// Prepended to every invoice number.
    /// Default: "INV-"
    pub invoice_prefix: String,

    /// Default tax rate.
    /// Default: 19%
    pub tax_rate: Rate,

    /// Charge tax when a sale request does not say.
    /// Default: false
    pub apply_tax_by_default: bool,

    /// Opening float of a cash session.
    /// Default: 0.00
    pub initial_cash_balance: Money,

    /// Stock level at or below which a product is reported as low.
    /// Default: 5
    pub low_stock_threshold: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let store = StoreSettings::default();
        LedgerConfig {
            db_path: PathBuf::from("till.db"),
            store_name: store.store_name,
            invoice_prefix: store.invoice_prefix,
            tax_rate: store.tax_rate,
            apply_tax_by_default: store.apply_tax_by_default,
            initial_cash_balance: store.initial_cash_balance,
            low_stock_threshold: store.low_stock_threshold,
        }
    }
}

impl LedgerConfig {
    /// Loads configuration from `TILL_*` environment variables over the
    /// defaults.
    ///
    /// | Variable | Format |
    /// |---|---|
    /// | `TILL_DB_PATH` | path |
    /// | `TILL_STORE_NAME` | text |
    /// | `TILL_INVOICE_PREFIX` | text |
    /// | `TILL_TAX_RATE` | percentage, e.g. `19` or `8.25` |
    /// | `TILL_APPLY_TAX` | `true` / `false` |
    /// | `TILL_INITIAL_CASH` | amount, e.g. `50000` or `50000.50` |
    /// | `TILL_LOW_STOCK_THRESHOLD` | integer ≥ 0 |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = LedgerConfig::default();

        if let Some(path) = lookup("TILL_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(name) = lookup("TILL_STORE_NAME") {
            config.store_name = name;
        }
        if let Some(prefix) = lookup("TILL_INVOICE_PREFIX") {
            config.invoice_prefix = prefix;
        }
        if let Some(rate) = lookup("TILL_TAX_RATE") {
            config.tax_rate = parse_rate(&rate)
                .ok_or_else(|| ConfigError::InvalidValue("TILL_TAX_RATE".to_string()))?;
        }
        if let Some(apply) = lookup("TILL_APPLY_TAX") {
            config.apply_tax_by_default = apply
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TILL_APPLY_TAX".to_string()))?;
        }
        if let Some(cash) = lookup("TILL_INITIAL_CASH") {
            config.initial_cash_balance = parse_money(&cash)
                .ok_or_else(|| ConfigError::InvalidValue("TILL_INITIAL_CASH".to_string()))?;
        }
        if let Some(threshold) = lookup("TILL_LOW_STOCK_THRESHOLD") {
            config.low_stock_threshold = threshold
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue("TILL_LOW_STOCK_THRESHOLD".to_string()))?
                .into();
        }

        Ok(config)
    }

    /// Settings row written when the database has none yet.
    pub fn store_defaults(&self) -> StoreSettings {
        StoreSettings {
            store_name: self.store_name.clone(),
            invoice_prefix: self.invoice_prefix.clone(),
            next_invoice_number: 1,
            tax_rate: self.tax_rate,
            apply_tax_by_default: self.apply_tax_by_default,
            initial_cash_balance: self.initial_cash_balance,
            low_stock_threshold: self.low_stock_threshold,
        }
    }
}

/// `"19"` → 1900 bps, `"8.25"` → 825 bps; at most 100%.
fn parse_rate(text: &str) -> Option<Rate> {
    let cents = parse_hundredths(text)?;
    if !(0..=Rate::FULL.bps() as i64).contains(&cents) {
        return None;
    }
    Some(Rate::from_bps(cents as u32))
}

/// `"50000"` → 50000.00, `"12.5"` → 12.50; never negative.
fn parse_money(text: &str) -> Option<Money> {
    let cents = parse_hundredths(text)?;
    (cents >= 0).then(|| Money::from_cents(cents))
}

fn parse_hundredths(text: &str) -> Option<i64> {
    let text = text.trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() || fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    whole.checked_mul(100)?.checked_add(fraction)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<LedgerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LedgerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        let config = load(&[]).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.store_defaults(), StoreSettings::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("TILL_DB_PATH", "/tmp/shop.db"),
            ("TILL_INVOICE_PREFIX", "FAC-"),
            ("TILL_TAX_RATE", "8.25"),
            ("TILL_APPLY_TAX", "true"),
            ("TILL_INITIAL_CASH", "50000"),
            ("TILL_LOW_STOCK_THRESHOLD", "2"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.invoice_prefix, "FAC-");
        assert_eq!(config.tax_rate, Rate::from_bps(825));
        assert!(config.apply_tax_by_default);
        assert_eq!(config.initial_cash_balance, Money::from_major_minor(50_000, 0));
        assert_eq!(config.low_stock_threshold, 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(load(&[("TILL_TAX_RATE", "150")]).is_err());
        assert!(load(&[("TILL_TAX_RATE", "abc")]).is_err());
        assert!(load(&[("TILL_INITIAL_CASH", "-5")]).is_err());
        assert!(load(&[("TILL_INITIAL_CASH", "1.234")]).is_err());
        assert!(load(&[("TILL_APPLY_TAX", "maybe")]).is_err());
        assert!(load(&[("TILL_LOW_STOCK_THRESHOLD", "-1")]).is_err());
    }

    #[test]
    fn test_parse_hundredths() {
        assert_eq!(parse_hundredths("12"), Some(1200));
        assert_eq!(parse_hundredths("12.5"), Some(1250));
        assert_eq!(parse_hundredths("12.05"), Some(1205));
        assert_eq!(parse_hundredths(".5"), None);
        assert_eq!(parse_hundredths("1.2.3"), None);
    }
}
