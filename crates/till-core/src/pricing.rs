//! # Pricing Engine
//!
//! Turns priced lines plus a discount request and a tax policy into the
//! monetary fields of a sale.
//!
//! ## Computation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal  = Σ line_total                                               │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  discount  = fixed > 0 ?  min(fixed, subtotal)                          │
//! │            : pct > 0   ?  round(subtotal × pct)                         │
//! │            :              0                                             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  tax       = apply ? round((subtotal − discount) × rate) : 0            │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  total     = subtotal − discount + tax                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A fixed discount always wins over a percentage; the two never combine.
//! Every step rounds half up to the hundredth, so the stored fields satisfy
//! `total == subtotal − discount + tax_amount` exactly.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, Rate};
use crate::types::SaleItem;
use crate::validation::{validate_non_negative, validate_rate, ValidationResult};

// =============================================================================
// Inputs
// =============================================================================

/// Discount requested for a sale.
///
/// Both fields may be supplied; a positive `fixed` value takes precedence
/// and the percentage is then discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountSpec {
    pub fixed: Option<Money>,
    pub percentage: Option<Rate>,
}

impl DiscountSpec {
    pub const fn none() -> Self {
        DiscountSpec {
            fixed: None,
            percentage: None,
        }
    }

    pub const fn fixed(amount: Money) -> Self {
        DiscountSpec {
            fixed: Some(amount),
            percentage: None,
        }
    }

    pub const fn percentage(rate: Rate) -> Self {
        DiscountSpec {
            fixed: None,
            percentage: Some(rate),
        }
    }

    /// Rejects negative fixed values and percentages above 100%.
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(fixed) = self.fixed {
            validate_non_negative("discount", fixed)?;
        }
        if let Some(rate) = self.percentage {
            validate_rate("discount_percentage", rate)?;
        }
        Ok(())
    }

    fn positive_fixed(&self) -> Option<Money> {
        self.fixed.filter(|m| m.is_positive())
    }

    fn positive_percentage(&self) -> Option<Rate> {
        self.percentage.filter(|r| !r.is_zero())
    }
}

/// Whether tax is charged and at which rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxPolicy {
    pub apply: bool,
    pub rate: Rate,
}

impl TaxPolicy {
    pub const fn exempt() -> Self {
        TaxPolicy {
            apply: false,
            rate: Rate::zero(),
        }
    }

    pub const fn charged(rate: Rate) -> Self {
        TaxPolicy { apply: true, rate }
    }
}

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingResult {
    pub subtotal: Money,
    pub discount: Money,
    /// Set only when the percentage path produced the discount.
    pub discount_percentage: Option<Rate>,
    pub tax_applied: bool,
    /// Set only when tax was applied.
    pub tax_rate: Option<Rate>,
    pub tax_amount: Money,
    pub total: Money,
}

impl PricingResult {
    /// Amount the tax was computed on.
    #[inline]
    pub fn taxable_base(&self) -> Money {
        self.subtotal - self.discount
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Prices a set of sale lines.
///
/// The caller validates quantities, prices and the discount spec
/// beforehand; the only failure left is a sum too large for [`Money`].
///
/// ## Example
/// ```rust
/// use till_core::money::{Money, Rate};
/// use till_core::pricing::{price, DiscountSpec, TaxPolicy};
/// use till_core::types::{ItemKind, SaleItem};
///
/// let router = SaleItem::new(1, ItemKind::Product, 2, Money::from_major_minor(25_000, 0), "Router").unwrap();
/// let result = price(&[router], &DiscountSpec::percentage(Rate::from_bps(1_000)), TaxPolicy::exempt()).unwrap();
///
/// assert_eq!(result.subtotal, Money::from_major_minor(50_000, 0));
/// assert_eq!(result.discount, Money::from_major_minor(5_000, 0));
/// assert_eq!(result.total, Money::from_major_minor(45_000, 0));
/// ```
pub fn price(
    lines: &[SaleItem],
    discount: &DiscountSpec,
    tax: TaxPolicy,
) -> ValidationResult<PricingResult> {
    let subtotal = lines
        .iter()
        .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total))
        .ok_or_else(|| too_large("subtotal"))?;

    let (discount_value, discount_percentage) = match discount.positive_fixed() {
        Some(fixed) => (fixed.min(subtotal), None),
        None => match discount.positive_percentage() {
            Some(rate) => (subtotal.percent_of(rate).min(subtotal), Some(rate)),
            None => (Money::zero(), None),
        },
    };

    let base = subtotal - discount_value;
    let (tax_amount, tax_rate) = if tax.apply {
        (base.percent_of(tax.rate), Some(tax.rate))
    } else {
        (Money::zero(), None)
    };
    let total = base.checked_add(tax_amount).ok_or_else(|| too_large("total"))?;

    Ok(PricingResult {
        subtotal,
        discount: discount_value,
        discount_percentage,
        tax_applied: tax.apply,
        tax_rate,
        tax_amount,
        total,
    })
}

fn too_large(field: &str) -> ValidationError {
    ValidationError::TooLarge {
        field: field.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemKind;

    fn units(n: i64) -> Money {
        Money::from_major_minor(n, 0)
    }

    fn line(qty: i64, unit: Money) -> SaleItem {
        SaleItem::new(1, ItemKind::Product, qty, unit, "Line").unwrap()
    }

    #[test]
    fn test_percentage_discount_without_tax() {
        let lines = [line(2, units(25_000))];
        let result = price(
            &lines,
            &DiscountSpec::percentage(Rate::from_bps(1_000)),
            TaxPolicy::exempt(),
        ).unwrap();

        assert_eq!(result.subtotal, units(50_000));
        assert_eq!(result.discount, units(5_000));
        assert_eq!(result.discount_percentage, Some(Rate::from_bps(1_000)));
        assert_eq!(result.tax_amount, Money::zero());
        assert_eq!(result.tax_rate, None);
        assert_eq!(result.total, units(45_000));
    }

    #[test]
    fn test_fixed_discount_is_capped_at_subtotal() {
        let lines = [line(1, units(50_000))];
        let result = price(&lines, &DiscountSpec::fixed(units(60_000)), TaxPolicy::exempt()).unwrap();

        assert_eq!(result.discount, units(50_000));
        assert_eq!(result.total, Money::zero());
        assert_eq!(result.discount_percentage, None);
    }

    #[test]
    fn test_fixed_discount_wins_over_percentage() {
        let lines = [line(1, units(10_000))];
        let spec = DiscountSpec {
            fixed: Some(units(1_000)),
            percentage: Some(Rate::from_bps(5_000)),
        };
        let result = price(&lines, &spec, TaxPolicy::exempt()).unwrap();

        assert_eq!(result.discount, units(1_000));
        assert_eq!(result.discount_percentage, None);
        assert_eq!(result.total, units(9_000));
    }

    #[test]
    fn test_zero_fixed_falls_back_to_percentage() {
        let lines = [line(1, units(10_000))];
        let spec = DiscountSpec {
            fixed: Some(Money::zero()),
            percentage: Some(Rate::from_bps(2_000)),
        };
        let result = price(&lines, &spec, TaxPolicy::exempt()).unwrap();

        assert_eq!(result.discount, units(2_000));
        assert_eq!(result.discount_percentage, Some(Rate::from_bps(2_000)));
    }

    #[test]
    fn test_tax_is_charged_on_discounted_base() {
        let lines = [line(1, units(100_000))];
        let result = price(
            &lines,
            &DiscountSpec::fixed(units(10_000)),
            TaxPolicy::charged(Rate::from_bps(1_900)),
        ).unwrap();

        assert_eq!(result.taxable_base(), units(90_000));
        assert_eq!(result.tax_amount, units(17_100));
        assert_eq!(result.tax_rate, Some(Rate::from_bps(1_900)));
        assert_eq!(result.total, units(107_100));
    }

    #[test]
    fn test_rounding_is_applied_per_step() {
        // 3 × 3.33 = 9.99; 15% discount = 1.4985 → 1.50; base 8.49;
        // 19% tax = 1.6131 → 1.61; total 10.10
        let lines = [line(3, Money::from_cents(333))];
        let result = price(
            &lines,
            &DiscountSpec::percentage(Rate::from_bps(1_500)),
            TaxPolicy::charged(Rate::from_bps(1_900)),
        ).unwrap();

        assert_eq!(result.subtotal.cents(), 999);
        assert_eq!(result.discount.cents(), 150);
        assert_eq!(result.tax_amount.cents(), 161);
        assert_eq!(result.total.cents(), 1010);
        assert_eq!(
            result.total,
            result.subtotal - result.discount + result.tax_amount
        );
    }

    #[test]
    fn test_no_discount() {
        let lines = [line(2, units(10)), line(1, units(5))];
        let result = price(&lines, &DiscountSpec::none(), TaxPolicy::exempt()).unwrap();
        assert_eq!(result.subtotal, units(25));
        assert_eq!(result.discount, Money::zero());
        assert_eq!(result.total, units(25));
    }

    #[test]
    fn test_subtotal_past_money_range_is_rejected() {
        let half = Money::from_cents(i64::MAX / 2);
        let lines = [line(1, half), line(1, half), line(1, units(1))];
        let err = price(&lines, &DiscountSpec::none(), TaxPolicy::exempt()).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { ref field } if field == "subtotal"));

        let lines = [line(1, half), line(1, half)];
        let err = price(&lines, &DiscountSpec::none(), TaxPolicy::charged(Rate::from_bps(1_900)))
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { ref field } if field == "total"));
    }

    #[test]
    fn test_discount_spec_validation() {
        assert!(DiscountSpec::fixed(Money::from_cents(-1)).validate().is_err());
        assert!(DiscountSpec::percentage(Rate::from_bps(10_001)).validate().is_err());
        assert!(DiscountSpec::percentage(Rate::from_bps(10_000)).validate().is_ok());
        assert!(DiscountSpec::none().validate().is_ok());
    }
}
