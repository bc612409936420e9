//! # Quantity Module
//!
//! Stock levels and cart quantities in thousandths of a unit.
//!
//! Products are sold by the piece and by weight ("1,5" kg of bread), so a
//! quantity may carry up to three decimals. Keeping it as an integer count
//! of milli-units lets stock checks compare exactly, the same way `Money`
//! avoids floating point.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::error::ValidationError;

/// A quantity of product, in thousandths of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    /// Milli-units per whole unit.
    pub const SCALE: i64 = 1000;

    /// Maximum number of decimals accepted when parsing.
    const MAX_DECIMALS: usize = 3;

    /// Creates a quantity of whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * Self::SCALE)
    }

    /// Creates a quantity from thousandths of a unit.
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Returns the raw count of thousandths.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Sum, or `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    /// Sum, or `OutOfRange` on overflow.
    pub fn try_add(self, other: Quantity) -> Result<Quantity, ValidationError> {
        self.checked_add(other).ok_or_else(|| ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX / Self::SCALE,
        })
    }

    /// Parses a quantity typed by the cashier.
    ///
    /// Accepts `,` or `.` as the decimal separator and at most three
    /// decimals. Negative quantities are rejected here; positivity of cart
    /// lines is checked separately.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::quantity::Quantity;
    ///
    /// assert_eq!(Quantity::parse("2").unwrap(), Quantity::from_units(2));
    /// assert_eq!(Quantity::parse("1,5").unwrap().milli(), 1500);
    /// assert!(Quantity::parse("1,2345").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Quantity, ValidationError> {
        let normalized = input.trim().replace(',', ".");

        if normalized.is_empty() {
            return Err(ValidationError::required("quantity"));
        }

        let (whole, fraction) = match normalized.split_once('.') {
            Some((w, f)) => (w, f),
            None => (normalized.as_str(), ""),
        };

        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if !all_digits(whole) || !all_digits(fraction) || (whole.is_empty() && fraction.is_empty())
        {
            return Err(ValidationError::invalid_format(
                "quantity",
                "must be a number like 2 or 1,5",
            ));
        }

        if fraction.len() > Self::MAX_DECIMALS {
            return Err(ValidationError::invalid_format(
                "quantity",
                "at most 3 decimals are allowed",
            ));
        }

        let overflow = || ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX / Self::SCALE,
        };

        let units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let padded = format!("{:0<width$}", fraction, width = Self::MAX_DECIMALS);
        let milli_part: i64 = padded.parse().map_err(|_| overflow())?;

        units
            .checked_mul(Self::SCALE)
            .and_then(|m| m.checked_add(milli_part))
            .map(Quantity)
            .ok_or_else(overflow)
    }
}

/// Renders with a comma decimal separator, trimming trailing zeros.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / Self::SCALE as u64;
        let frac = abs % Self::SCALE as u64;

        if frac == 0 {
            write!(f, "{}{}", sign, units)
        } else {
            let frac = format!("{:03}", frac);
            write!(f, "{}{},{}", sign, units, frac.trim_end_matches('0'))
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}
