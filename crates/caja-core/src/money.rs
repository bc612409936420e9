//! # Money Module
//!
//! Provides the `Money` type for Chilean peso amounts.
//!
//! ## Whole Pesos Only
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CLP has no minor unit in circulation. Every amount in the system is   │
//! │  an integer number of pesos:                                           │
//! │                                                                         │
//! │     stored:     12345                                                   │
//! │     displayed:  "$12.345"     (es-CL grouping, zero decimals)           │
//! │     typed:      "12.345" / "$ 12345" / "12,345"  → 12345                │
//! │                                                                         │
//! │  Fractional results (price × 1,5 kg) are rounded once, at the line.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::money::Money;
//!
//! let price = Money::from_pesos(12345);
//! assert_eq!(price.format_clp(), "$12.345");
//! assert_eq!(Money::parse_clp("$12.345").unwrap(), price);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::error::ValidationError;
use crate::quantity::Quantity;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole pesos.
///
/// ## Design Decisions
/// - **i64 (signed)**: register balances may go negative after large egresos
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Transparent sqlx type**: stored as INTEGER
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole pesos.
    #[inline]
    pub const fn from_pesos(pesos: i64) -> Self {
        Money(pesos)
    }

    /// Returns the value in whole pesos.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// The product is rounded half away from zero to a whole peso.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::money::Money;
    /// use caja_core::quantity::Quantity;
    ///
    /// let per_kg = Money::from_pesos(1990);
    /// let line = per_kg.times(Quantity::parse("1,5").unwrap()).unwrap();
    /// assert_eq!(line.pesos(), 2985);
    /// ```
    ///
    /// ## Errors
    /// * `ValidationError::OutOfRange` - the result does not fit in i64
    pub fn times(&self, quantity: Quantity) -> Result<Money, ValidationError> {
        self.checked_times(quantity).ok_or_else(|| out_of_range("total"))
    }

    /// [`Money::times`], or `None` on overflow.
    pub fn checked_times(&self, quantity: Quantity) -> Option<Money> {
        // i128 keeps price × milli-units from overflowing
        let raw = self.0 as i128 * quantity.milli() as i128;
        let scale = Quantity::SCALE as i128;
        let half = scale / 2;
        let rounded = if raw >= 0 {
            (raw + half) / scale
        } else {
            (raw - half) / scale
        };
        i64::try_from(rounded).ok().map(Money)
    }

    /// Sum, or `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Formats the amount the way es-CL renders CLP currency.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::from_pesos(0).format_clp(), "$0");
    /// assert_eq!(Money::from_pesos(999999).format_clp(), "$999.999");
    /// assert_eq!(Money::from_pesos(-1500).format_clp(), "-$1.500");
    /// ```
    pub fn format_clp(&self) -> String {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}${}", sign, grouped)
    }

    /// Parses user input into a peso amount.
    ///
    /// Every non-digit character is stripped (symbols, separators, spaces,
    /// and also a leading minus). Input with no digits is zero.
    ///
    /// ## Returns
    /// * `Ok(Money)` - parsed amount
    /// * `Err(ValidationError::OutOfRange)` - more digits than fit in i64
    pub fn parse_clp(input: &str) -> Result<Money, ValidationError> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();

        if digits.is_empty() {
            return Ok(Money::zero());
        }

        digits
            .parse::<i64>()
            .map(Money)
            .map_err(|_| out_of_range("amount"))
    }
}

/// A peso amount that does not fit in i64.
pub(crate) fn out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_clp())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
