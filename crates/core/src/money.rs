//! Currency-agnostic monetary amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// A decimal amount in the shop's single (unnamed) currency.
///
/// Exact decimal arithmetic; no rounding happens anywhere in the engine.
/// Arithmetic is checked: `None` means the result does not fit a `Decimal`.
/// Serialized as a decimal string so event payloads round-trip losslessly.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Line total: `self × quantity`.
    pub fn checked_times(&self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(Decimal::from(quantity)).map(Money)
    }

    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0.normalize(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn line_totals_are_exact() {
        let price = Money::new(Decimal::from_str("19.99").unwrap());
        assert_eq!(
            price.checked_times(3),
            Some(Money::new(Decimal::from_str("59.97").unwrap()))
        );
    }

    #[test]
    fn sum_of_nothing_is_zero() {
        let total = Money::checked_sum(Vec::new()).unwrap();
        assert_eq!(total, Money::ZERO);
        assert!(!total.is_positive());
    }

    #[test]
    fn overflow_is_reported_instead_of_panicking() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.checked_times(2), None);
        assert_eq!(huge.checked_add(Money::from(1)), None);
        assert_eq!(Money::checked_sum([huge, huge]), None);

        let price = Money::new(Decimal::from_str("100000000000000000000").unwrap());
        assert_eq!(price.checked_times(1_000_000_000), None);
    }

    #[test]
    fn deserializes_from_json_numbers_and_strings() {
        let from_number: Money = serde_json::from_str("1500").unwrap();
        let from_string: Money = serde_json::from_str("\"1500\"").unwrap();
        assert_eq!(from_number, Money::from(1500));
        assert_eq!(from_string, Money::from(1500));
    }
}
