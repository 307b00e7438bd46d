//! Money types with precise decimal arithmetic
//!
//! Subscription prices, collections, commissions and settlement totals all
//! flow through [`Money`], which wraps `rust_decimal` so that revenue splits
//! never pick up floating-point drift.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Iraqi dinar, the platform's operating currency
    IQD,
    USD,
}

impl Currency {
    /// Returns the number of decimal places used for display and rounding
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::IQD => 0,
            Currency::USD => 2,
        }
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::IQD => "IQD",
            Currency::USD => "$",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::IQD => "IQD",
            Currency::USD => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IQD" => Ok(Currency::IQD),
            "USD" => Ok(Currency::USD),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid rate: {0}% is outside 0..=100")]
    InvalidRate(Decimal),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

/// A monetary amount with associated currency
///
/// Amounts are kept at 4 decimal places internally so that percentage
/// splits stay exact before being rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(4),
            currency,
        }
    }

    /// Creates a strictly positive Money value, as required for collections
    pub fn positive(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        if amount <= Decimal::ZERO {
            return Err(MoneyError::InvalidAmount(format!(
                "{} must be greater than zero",
                amount
            )));
        }
        Ok(Self::new(amount, currency))
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    /// Sums an iterator of amounts, failing on the first currency mismatch
    pub fn sum<'a, I>(items: I, currency: Currency) -> Result<Money, MoneyError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        items
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is positive
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn abs(&self) -> Self {
        Self {
            amount: self.amount.abs(),
            currency: self.currency,
        }
    }

    /// Checked addition that returns an error on currency mismatch
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Multiplies by a scalar (e.g., for rate calculations)
    pub fn multiply(&self, factor: Decimal) -> Self {
        Self::new(self.amount * factor, self.currency)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{} {:.dp$}",
            self.currency.symbol(),
            self.amount,
            dp = dp as usize
        )
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.checked_add(&other)
            .expect("Currency mismatch in Money::add")
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self.checked_sub(&other)
            .expect("Currency mismatch in Money::sub")
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.amount, self.currency)
    }
}

/// A percentage rate such as an agent commission or the company share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// The rate as a decimal (e.g., 0.05 for 5%)
    value: Decimal,
}

impl Rate {
    /// Creates a rate from a percentage (e.g., 5.0 for 5%)
    pub fn from_percentage(percentage: Decimal) -> Self {
        Self {
            value: percentage / dec!(100),
        }
    }

    /// Creates a rate from a percentage, rejecting values outside 0..=100
    pub fn try_from_percentage(percentage: Decimal) -> Result<Self, MoneyError> {
        if percentage < Decimal::ZERO || percentage > dec!(100) {
            return Err(MoneyError::InvalidRate(percentage));
        }
        Ok(Self::from_percentage(percentage))
    }

    pub fn zero() -> Self {
        Self { value: Decimal::ZERO }
    }

    /// Returns the rate as a decimal
    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    /// Returns the rate as a percentage
    pub fn as_percentage(&self) -> Decimal {
        self.value * dec!(100)
    }

    /// Applies this rate to a money amount
    pub fn apply(&self, money: &Money) -> Money {
        money.multiply(self.value)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().round_dp(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let m = Money::new(dec!(25000), Currency::IQD);
        assert_eq!(m.amount(), dec!(25000));
        assert_eq!(m.currency(), Currency::IQD);
    }

    #[test]
    fn test_positive_rejects_zero() {
        assert!(Money::positive(dec!(0), Currency::IQD).is_err());
        assert!(Money::positive(dec!(-5), Currency::IQD).is_err());
        assert!(Money::positive(dec!(5), Currency::IQD).is_ok());
    }

    #[test]
    fn test_currency_mismatch() {
        let iqd = Money::new(dec!(100), Currency::IQD);
        let usd = Money::new(dec!(100), Currency::USD);

        let result = iqd.checked_add(&usd);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_sum() {
        let items = vec![
            Money::new(dec!(10000), Currency::IQD),
            Money::new(dec!(15000), Currency::IQD),
        ];
        let total = Money::sum(&items, Currency::IQD).unwrap();
        assert_eq!(total.amount(), dec!(25000));
    }

    #[test]
    fn test_rate_application() {
        let rate = Rate::from_percentage(dec!(10));
        let amount = Money::new(dec!(50000), Currency::IQD);

        assert_eq!(rate.apply(&amount).amount(), dec!(5000));
    }

    #[test]
    fn test_rate_bounds() {
        assert!(Rate::try_from_percentage(dec!(100)).is_ok());
        assert!(Rate::try_from_percentage(dec!(0)).is_ok());
        assert_eq!(
            Rate::try_from_percentage(dec!(100.5)),
            Err(MoneyError::InvalidRate(dec!(100.5)))
        );
        assert!(Rate::try_from_percentage(dec!(-1)).is_err());
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("iqd".parse::<Currency>().unwrap(), Currency::IQD);
        assert!("EUR".parse::<Currency>().is_err());
    }
}
