//! # Validation Module
//!
//! Input validation for ledger requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  └── Unknown item kinds, malformed numbers                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Quantities, amounts, reasons, concepts                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0)                                             │
//! │  ├── UNIQUE invoice_number                                             │
//! │  └── one open session per date (partial unique index)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_quantity, validate_cancel_reason};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_cancel_reason("customer returned item").is_ok());
//! assert!(validate_cancel_reason("oops").is_err());
//! ```

use crate::error::ValidationError;
use crate::money::{Money, Rate};
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_LINES, MIN_CANCEL_REASON_LEN, MIN_EXPENSE_CONCEPT_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_product_code;
///
/// assert!(validate_product_code("CBL-USB-1M").is_ok());
/// assert!(validate_product_code("").is_err());
/// assert!(validate_product_code("has space").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a free-text description (product, service or ad-hoc line).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_description(field: &str, text: &str) -> ValidationResult<()> {
    let text = text.trim();

    if text.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if text.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a sale cancellation reason.
///
/// ## Rules
/// - At least 5 characters once trimmed, so the audit trail says something
/// - At most 500 characters
pub fn validate_cancel_reason(reason: &str) -> ValidationResult<()> {
    let len = reason.trim().chars().count();

    if len < MIN_CANCEL_REASON_LEN {
        return Err(ValidationError::TooShort {
            field: "reason".to_string(),
            min: MIN_CANCEL_REASON_LEN,
        });
    }

    if len > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }

    Ok(())
}

/// Validates an expense concept.
///
/// ## Rules
/// - At least 3 characters once trimmed
/// - At most 200 characters
pub fn validate_expense_concept(concept: &str) -> ValidationResult<()> {
    let len = concept.trim().chars().count();

    if len < MIN_EXPENSE_CONCEPT_LEN {
        return Err(ValidationError::TooShort {
            field: "concept".to_string(),
            min: MIN_EXPENSE_CONCEPT_LEN,
        });
    }

    if len > 200 {
        return Err(ValidationError::TooLong {
            field: "concept".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
///
/// ```text
/// validate_quantity(qty)
///      │
///      ├── qty <= 0?     → "quantity must be positive"
///      ├── qty > 9999?   → "quantity must be between 1 and 9999"
///      └── OK
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates that an amount is not negative.
///
/// Zero is allowed (free lines, empty drawer, zero-value expense).
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("price", Money::zero()).is_ok());
/// assert!(validate_non_negative("price", Money::from_cents(-1)).is_err());
/// ```
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage rate (0% to 100%).
pub fn validate_rate(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate > Rate::FULL {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: Rate::FULL.bps() as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a sale request.
///
/// ## Rules
/// - At least one line
/// - At most MAX_SALE_LINES
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_code() {
        assert!(validate_product_code("P-001").is_ok());
        assert!(validate_product_code("item_1").is_ok());

        assert!(validate_product_code("").is_err());
        assert!(validate_product_code("   ").is_err());
        assert!(validate_product_code("has space").is_err());
        assert!(validate_product_code(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description("description", "Screen repair").is_ok());
        assert!(validate_description("description", "  ").is_err());
        assert!(validate_description("description", &"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_cancel_reason() {
        assert!(validate_cancel_reason("wrong item").is_ok());
        assert!(validate_cancel_reason("abcde").is_ok());
        assert!(validate_cancel_reason(" abcd ").is_err());
        assert!(validate_cancel_reason("").is_err());
    }

    #[test]
    fn test_validate_expense_concept() {
        assert!(validate_expense_concept("Rent").is_ok());
        assert!(validate_expense_concept("Tea").is_ok());
        assert!(validate_expense_concept("ab").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate("tax_rate", Rate::zero()).is_ok());
        assert!(validate_rate("tax_rate", Rate::from_bps(10_000)).is_ok());
        assert!(validate_rate("tax_rate", Rate::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_SALE_LINES + 1).is_err());
    }
}
