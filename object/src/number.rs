use core::fmt;
use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_traits::{Signed, ToPrimitive, Zero};

/// Significant digits kept after every arithmetic operation.
pub const PRECISION: u64 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberError {
    Parse(String),
    DivisionByZero,
    InvalidOperation(&'static str),
    Overflow,
}

impl fmt::Display for NumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(text) => write!(f, "'{text}' is not a number"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::InvalidOperation(what) => write!(f, "invalid operation: {what}"),
            Self::Overflow => write!(f, "number does not fit the target range"),
        }
    }
}

impl std::error::Error for NumberError {}

/// An arbitrary-precision decimal rounded to [`PRECISION`] digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Number(BigDecimal);

impl Number {
    pub fn parse(text: &str) -> Result<Self, NumberError> {
        BigDecimal::from_str(text.trim())
            .map(Self::rounded)
            .map_err(|_| NumberError::Parse(text.to_string()))
    }

    pub fn from_i64(n: i64) -> Self {
        Self::rounded(BigDecimal::from(n))
    }

    /// Round to the working precision and drop trailing fractional zeros.
    fn rounded(value: BigDecimal) -> Self {
        let value = value.with_prec(PRECISION).normalized();
        // keep integers in plain notation: 100, not 1E+2
        let (_, scale) = value.as_bigint_and_exponent();
        if scale < 0 {
            Self(value.with_scale(0))
        } else {
            Self(value)
        }
    }

    pub fn add(&self, other: &Number) -> Number {
        Self::rounded(&self.0 + &other.0)
    }

    pub fn sub(&self, other: &Number) -> Number {
        Self::rounded(&self.0 - &other.0)
    }

    pub fn mul(&self, other: &Number) -> Number {
        Self::rounded(&self.0 * &other.0)
    }

    pub fn div(&self, other: &Number) -> Result<Number, NumberError> {
        if other.0.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        Ok(Self::rounded(&self.0 / &other.0))
    }

    pub fn sqrt(&self) -> Result<Number, NumberError> {
        if self.0.is_negative() {
            return Err(NumberError::InvalidOperation("square root of a negative"));
        }
        self.0
            .sqrt()
            .map(Self::rounded)
            .ok_or(NumberError::InvalidOperation("square root"))
    }

    /// Integral part, toward zero.
    pub fn truncate(&self) -> Result<i64, NumberError> {
        self.0.with_scale(0).to_i64().ok_or(NumberError::Overflow)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(text: &str) -> Number {
        Number::parse(text).unwrap()
    }

    #[test]
    fn integer_arithmetic_prints_plainly() {
        assert_eq!(n("3").add(&n("4")).to_string(), "7");
        assert_eq!(n("10").mul(&n("10")).to_string(), "100");
        assert_eq!(n("2.50").sub(&n("0.5")).to_string(), "2");
    }

    #[test]
    fn division_keeps_sixteen_digits() {
        assert_eq!(n("1").div(&n("4")).unwrap().to_string(), "0.25");
        assert_eq!(
            n("1").div(&n("3")).unwrap().to_string(),
            "0.3333333333333333"
        );
        assert_eq!(n("1").div(&n("0")), Err(NumberError::DivisionByZero));
    }

    #[test]
    fn sqrt_and_truncate() {
        assert_eq!(n("16").sqrt().unwrap().to_string(), "4");
        assert!(matches!(
            n("-1").sqrt(),
            Err(NumberError::InvalidOperation(_))
        ));
        assert_eq!(n("3.9").truncate(), Ok(3));
        assert_eq!(n("-3.9").truncate(), Ok(-3));
        assert_eq!(n("1e30").truncate(), Err(NumberError::Overflow));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(Number::parse("abc"), Err(NumberError::Parse(_))));
    }

    #[test]
    fn ordering_ignores_representation() {
        assert_eq!(n("2.0").cmp(&n("2")), Ordering::Equal);
        assert!(n("-1") < n("0.5"));
    }
}
