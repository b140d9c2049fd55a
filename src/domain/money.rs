use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Minor units per major currency unit (cents per dollar, paise per rupee).
const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// A positive monetary amount in integer minor units.
///
/// All arithmetic inside the core is integer arithmetic; decimal values only
/// appear at the boundary (CLI input, reports) and are converted exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    pub fn from_minor_units(value: i64) -> Result<Self, PaymentError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(PaymentError::InvalidInput(
                "amount must be positive".to_string(),
            ))
        }
    }

    /// Converts a major-unit decimal (e.g. "10.50") into minor units.
    ///
    /// Rejects values with sub-minor-unit precision outright rather than
    /// rounding, so a tampered or mistyped amount never drifts silently.
    pub fn from_decimal(value: Decimal) -> Result<Self, PaymentError> {
        let minor = value * Decimal::from(MINOR_UNITS_PER_MAJOR);
        if minor.fract() != Decimal::ZERO {
            return Err(PaymentError::InvalidInput(format!(
                "amount {value} has sub-minor-unit precision"
            )));
        }
        let units = i64::try_from(minor.trunc())
            .map_err(|_| PaymentError::InvalidInput(format!("amount {value} out of range")))?;
        Self::from_minor_units(units)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// The major-unit decimal representation, for display and gateway APIs
    /// that want "10.50"-style values.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// An accumulated ledger balance in integer minor units.
///
/// Non-negative by policy: this core only credits. The wrapper exists so a
/// balance and a single payment amount cannot be mixed up at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Balance(pub i64);

impl Balance {
    pub const ZERO: Self = Self(0);

    pub fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}
