//! Money type in fixed-point minor units.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! All balances and amounts are integer kobo (1/100 NGN); `rust_decimal`
//! is used only to convert to and from human-facing major units.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A monetary amount in minor units (kobo).
///
/// Wraps an `i64` so that every arithmetic operation is explicit and
/// checked. Serializes as a plain integer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

/// Errors from money conversion and arithmetic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// Arithmetic overflowed the i64 minor-unit range.
    #[error("monetary arithmetic overflow")]
    Overflow,

    /// A major-unit value had sub-kobo precision or is out of range.
    #[error("amount {0} is not representable in minor units")]
    NotRepresentable(Decimal),
}

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates a Money value from minor units (kobo).
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Converts a major-unit decimal (naira) into minor units.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::NotRepresentable` if the value has more than
    /// two decimal places or does not fit in `i64` kobo.
    pub fn from_major(major: Decimal) -> Result<Self, MoneyError> {
        let scaled = major
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(MoneyError::NotRepresentable(major))?;
        if scaled.normalize().scale() > 0 {
            return Err(MoneyError::NotRepresentable(major));
        }
        let minor: i64 = scaled
            .try_into()
            .map_err(|_| MoneyError::NotRepresentable(major))?;
        Ok(Self(minor))
    }

    /// Returns the amount as a major-unit decimal (naira).
    #[must_use]
    pub fn to_major(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` on i64 overflow.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` on i64 overflow.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_major())
    }
}
