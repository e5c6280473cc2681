use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Non-negative, currency-agnostic transaction amount.
///
/// Backed by [`Decimal`] so that sums are exact: the summary of a ledger is
/// always the precise fold of its amounts, without floating-point drift.
///
/// # Examples
///
/// ```rust
/// use ledger::Amount;
///
/// let amount: Amount = "12.50".parse().unwrap();
/// assert_eq!(amount, Amount::from_major(12) + "0.5".parse().unwrap());
/// assert_eq!(amount.to_string(), "12.50");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects
/// negative and non-numeric values):
///
/// ```rust
/// use ledger::Amount;
///
/// assert!("10,5".parse::<Amount>().is_ok());
/// assert!("-1".parse::<Amount>().is_err());
/// assert!("abc".parse::<Amount>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

/// Largest accepted amount, in major units.
///
/// Keeps every realistic sum of amounts far below `Decimal::MAX`, so folding
/// a ledger never overflows.
pub const MAX_AMOUNT: u64 = 1_000_000_000_000_000;

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Creates an amount from a whole number of major units.
    #[must_use]
    pub fn from_major(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Wraps a decimal, rejecting negative values and values above
    /// [`MAX_AMOUNT`].
    pub fn new(value: Decimal) -> Result<Self, LedgerError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(LedgerError::Validation(
                "amount must not be negative".to_string(),
            ));
        }
        if value > Decimal::from(MAX_AMOUNT) {
            return Err(LedgerError::Validation(format!(
                "amount must not exceed {MAX_AMOUNT}"
            )));
        }
        Ok(Self(value))
    }

    /// Returns the underlying decimal value.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{:.2}", self.0))
    }
}

/// Stored amounts go through the same checks as user input.
impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

/// The difference of two amounts may be negative, so it leaves the `Amount`
/// domain.
impl Sub for Amount {
    type Output = Decimal;

    fn sub(self, rhs: Amount) -> Self::Output {
        self.0 - rhs.0
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl FromStr for Amount {
    type Err = LedgerError;

    /// Parses a decimal string.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`.
    ///
    /// Validation rules:
    /// - rejects empty/invalid strings
    /// - rejects negative values
    /// - rejects exponents, `NaN` and infinities (only plain decimals parse)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::Validation(format!("amount \"{}\" is not a number", s.trim()));

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::Validation("amount is required".to_string()));
        }

        let rest = trimmed.strip_prefix('+').unwrap_or(trimmed).trim();
        if rest.starts_with('-') {
            return Err(LedgerError::Validation(
                "amount must not be negative".to_string(),
            ));
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let whole = parts.next().ok_or_else(invalid)?;
        let frac = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }
        let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_none_or(str::is_empty))
            || !digits(whole)
            || !frac.is_none_or(digits)
        {
            return Err(invalid());
        }

        let normalized = match frac {
            Some(frac) if !frac.is_empty() => format!("{}.{frac}", whole_or_zero(whole)),
            _ => whole_or_zero(whole).to_string(),
        };
        let value = Decimal::from_str(&normalized).map_err(|_| invalid())?;
        Amount::new(value)
    }
}

fn whole_or_zero(whole: &str) -> &str {
    if whole.is_empty() { "0" } else { whole }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Amount::ZERO.to_string(), "0.00");
        assert_eq!("0.1".parse::<Amount>().unwrap().to_string(), "0.10");
        assert_eq!("1050".parse::<Amount>().unwrap().to_string(), "1050.00");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        let expected = Amount::new(Decimal::new(1050, 2)).unwrap();
        assert_eq!("10.5".parse::<Amount>().unwrap(), expected);
        assert_eq!("10,50".parse::<Amount>().unwrap(), expected);
        assert_eq!("+10.50".parse::<Amount>().unwrap(), expected);
        assert_eq!("  10.50 ".parse::<Amount>().unwrap(), expected);
        assert_eq!(".5".parse::<Amount>().unwrap(), Amount::new(Decimal::new(5, 1)).unwrap());
        assert_eq!("12.".parse::<Amount>().unwrap(), Amount::from_major(12));
    }

    #[test]
    fn rejects_amounts_above_the_cap() {
        let cap = MAX_AMOUNT.to_string();
        assert_eq!(cap.parse::<Amount>().unwrap(), Amount::from_major(MAX_AMOUNT));
        for raw in [
            format!("{cap}.01"),
            "79228162514264337593543950335".to_string(),
            "99999999999999999999999999999999".to_string(),
        ] {
            assert!(
                matches!(raw.parse::<Amount>(), Err(LedgerError::Validation(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn deserialization_applies_the_same_checks() {
        let amount: Amount = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(amount, Amount::new(Decimal::new(1250, 2)).unwrap());
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"12.50\"");
        assert!(serde_json::from_str::<Amount>("\"-5\"").is_err());
        assert!(serde_json::from_str::<Amount>("\"79228162514264337593543950335\"").is_err());
    }

    #[test]
    fn summing_many_capped_amounts_does_not_overflow() {
        let max = Amount::from_major(MAX_AMOUNT);
        let total: Amount = std::iter::repeat_n(max, 10_000).sum();
        assert_eq!(total.value(), Decimal::from(MAX_AMOUNT) * Decimal::from(10_000));
    }

    #[test]
    fn parse_keeps_extra_precision() {
        let amount = "12.345".parse::<Amount>().unwrap();
        assert_eq!(amount.value(), Decimal::new(12345, 3));
    }

    #[test]
    fn parse_rejects_garbage() {
        for raw in ["", "   ", "abc", "1.2.3", "1e3", "NaN", "inf", ".", "1 000", "--1"] {
            assert!(
                matches!(raw.parse::<Amount>(), Err(LedgerError::Validation(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_rejects_negative() {
        assert_eq!(
            "-0.01".parse::<Amount>(),
            Err(LedgerError::Validation(
                "amount must not be negative".to_string()
            ))
        );
    }

    #[test]
    fn sum_and_difference_are_exact() {
        let parts: Vec<Amount> = ["0.1", "0.2"].iter().map(|s| s.parse().unwrap()).collect();
        let total: Amount = parts.into_iter().sum();
        assert_eq!(total, "0.3".parse().unwrap());
        assert_eq!(Amount::from_major(1) - Amount::from_major(3), Decimal::from(-2));
    }
}
