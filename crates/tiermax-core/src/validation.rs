//! # Validation Module
//!
//! Quantity coercion and catalog validation for Tier Max.
//!
//! ## Where Coercion Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Quantity Coercion Points                           │
//! │                                                                         │
//! │  Admin form submit ("2", " 10", "3.9", "abc", "-4")                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  coerce_quantity()  ← write time, in RuleEditor                        │
//! │  ├── "2"   → 2       "3.9" → 3                                         │
//! │  └── "abc" → 0       "-4"  → 4                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Product rule store (typed, non-negative)                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Override hooks may return anything                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  normalize_quantity()  ← read time, in the resolver                    │
//! │                                                                         │
//! │  0 always means "no override"                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Coercion never fails: anything unusable becomes 0.

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted plan slug or plan name.
pub const MAX_PLAN_FIELD_LEN: usize = 200;

// =============================================================================
// Quantity Coercion
// =============================================================================

/// Coerces free-form submitted text into a non-negative quantity.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Integers parse as-is, decimals and exponents are truncated toward zero
/// - Otherwise the leading integer prefix is used (`"12abc"` → 12)
/// - No leading digits → 0
/// - The sign is dropped (absolute value); overflow saturates
///
/// ## Example
/// ```rust
/// use tiermax_core::validation::coerce_quantity;
///
/// assert_eq!(coerce_quantity("2"), 2);
/// assert_eq!(coerce_quantity("3.9"), 3);
/// assert_eq!(coerce_quantity("-4"), 4);
/// assert_eq!(coerce_quantity("abc"), 0);
/// ```
pub fn coerce_quantity(raw: &str) -> i64 {
    let raw = raw.trim();

    if let Ok(n) = raw.parse::<i64>() {
        return normalize_quantity(n);
    }

    if let Ok(f) = raw.parse::<f64>() {
        // "inf" and "NaN" parse as floats but are not quantities
        if !f.is_finite() {
            return 0;
        }
        // `as` saturates at the i64 bounds
        return normalize_quantity(f.trunc() as i64);
    }

    normalize_quantity(leading_integer(raw))
}

/// Absolute value of a quantity, saturating at `i64::MAX`.
#[inline]
pub fn normalize_quantity(value: i64) -> i64 {
    value.saturating_abs()
}

/// Parses an optional sign followed by digits, stopping at the first
/// non-digit. Returns 0 if there are no digits.
fn leading_integer(raw: &str) -> i64 {
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(b - b'0'));
    }

    if negative {
        -value
    } else {
        value
    }
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a membership plan slug before it is stored.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
/// - Lowercase letters, digits, hyphens and underscores only
pub fn validate_plan_slug(slug: &str) -> ValidationResult<()> {
    if slug.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "slug".to_string(),
        });
    }

    if slug.len() > MAX_PLAN_FIELD_LEN {
        return Err(ValidationError::TooLong {
            field: "slug".to_string(),
            max: MAX_PLAN_FIELD_LEN,
        });
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "slug".to_string(),
            reason: "must contain only lowercase letters, numbers, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a membership plan display name.
pub fn validate_plan_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_PLAN_FIELD_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_PLAN_FIELD_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
