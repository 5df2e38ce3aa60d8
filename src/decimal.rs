//! Arbitrary-precision decimal numbers, the numeric tower of the language.
//!
//! A value is represented as `mantissa * 10^-scale` and kept normalized,
//! so that every number has exactly one representation and comparisons
//! are plain field comparisons.

use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::ops;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::{Pow, Signed, ToPrimitive, Zero};

/// Number of fractional digits a quotient is computed to before truncating.
const DIV_PRECISION: u32 = 34;

/// An exact base-10 number of arbitrary magnitude.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    /// Decimal digits of the number, with the sign.
    mantissa: BigInt,
    /// How many of the trailing mantissa digits are fractional.
    /// Zero for integers; never ends in a redundant zero digit.
    scale: u32,
}

impl Decimal {
    // ==================== Constructors ====================

    pub fn new(mantissa: BigInt, scale: u32) -> Decimal {
        let mut d = Decimal { mantissa, scale };
        d.normalize();
        d
    }

    pub fn from_int(int: i64) -> Decimal {
        Decimal {
            mantissa: BigInt::from(int),
            scale: 0,
        }
    }

    pub fn zero() -> Decimal {
        Decimal::from_int(0)
    }

    pub fn one() -> Decimal {
        Decimal::from_int(1)
    }

    /// Strip trailing zero digits off the fractional part.
    fn normalize(&mut self) {
        let ten = BigInt::from(10);
        while self.scale > 0 && (&self.mantissa % &ten).is_zero() {
            self.mantissa = &self.mantissa / &ten;
            self.scale -= 1;
        }
        if self.mantissa.is_zero() {
            self.scale = 0;
        }
    }

    // ==================== Destructors ====================

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// True if the number has no fractional part.
    pub fn is_integer(&self) -> bool {
        self.scale == 0
    }

    /// The number as an `i64`, if it is an integer in range.
    pub fn to_i64(&self) -> Option<i64> {
        if self.is_integer() {
            self.mantissa.to_i64()
        } else {
            None
        }
    }

    // ==================== Arithmetic ====================

    /// Divide, truncating the quotient after [`DIV_PRECISION`] fractional
    /// digits. Returns `None` for a zero divisor.
    pub fn checked_div(&self, rhs: &Decimal) -> Option<Decimal> {
        if rhs.is_zero() {
            return None;
        }
        // result = (a.m / b.m) * 10^(b.scale - a.scale), brought to
        // `target` fractional digits before the integer division truncates.
        let target = i64::from(DIV_PRECISION).max(i64::from(self.scale) - i64::from(rhs.scale));
        let shift = (target + i64::from(rhs.scale) - i64::from(self.scale)) as u32;
        let quotient = (&self.mantissa * pow10(shift)) / &rhs.mantissa;
        Some(Decimal::new(quotient, target as u32))
    }

    /// Raise to an integer power. Returns `None` for fractional or
    /// absurdly large exponents.
    pub fn checked_pow(&self, exponent: &Decimal) -> Option<Decimal> {
        let exp = exponent.to_i64()?;
        if exp >= 0 {
            let exp = u32::try_from(exp).ok()?;
            let scale = self.scale.checked_mul(exp)?;
            Some(Decimal::new((&self.mantissa).pow(exp), scale))
        } else {
            let positive = self.checked_pow(&Decimal::from_int(-exp))?;
            Decimal::one().checked_div(&positive)
        }
    }

    /// Mantissas of both operands brought to a common scale.
    fn aligned(&self, other: &Decimal) -> (BigInt, BigInt, u32) {
        let scale = self.scale.max(other.scale);
        let lhs = &self.mantissa * pow10(scale - self.scale);
        let rhs = &other.mantissa * pow10(scale - other.scale);
        (lhs, rhs, scale)
    }
}

fn pow10(exp: u32) -> BigInt {
    BigInt::from(10).pow(exp)
}

impl ops::Add for &Decimal {
    type Output = Decimal;

    fn add(self, rhs: &Decimal) -> Decimal {
        let (lhs, rhs, scale) = self.aligned(rhs);
        Decimal::new(lhs + rhs, scale)
    }
}

impl ops::Sub for &Decimal {
    type Output = Decimal;

    fn sub(self, rhs: &Decimal) -> Decimal {
        let (lhs, rhs, scale) = self.aligned(rhs);
        Decimal::new(lhs - rhs, scale)
    }
}

impl ops::Mul for &Decimal {
    type Output = Decimal;

    fn mul(self, rhs: &Decimal) -> Decimal {
        Decimal::new(&self.mantissa * &rhs.mantissa, self.scale + rhs.scale)
    }
}

impl ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(mut self) -> Decimal {
        self.mantissa = -self.mantissa;
        self
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Decimal) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Decimal) -> Ordering {
        let (lhs, rhs, _) = self.aligned(other);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let digits = self.mantissa.abs().to_string();
        let scale = self.scale as usize;
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        if digits.len() <= scale {
            write!(f, "{}0.{}{}", sign, "0".repeat(scale - digits.len()), digits)
        } else {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{}{}.{}", sign, int, frac)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError;

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal")
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Decimal, ParseDecimalError> {
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, s),
        };
        let (int, frac) = match digits.find('.') {
            Some(dot) => (&digits[..dot], &digits[dot + 1..]),
            None => (digits, ""),
        };
        if int.is_empty() && frac.is_empty() {
            return Err(ParseDecimalError);
        }
        if !int.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseDecimalError);
        }
        let mantissa: BigInt = format!("{}{}", int, frac)
            .parse()
            .map_err(|_| ParseDecimalError)?;
        Ok(Decimal::new(mantissa * sign, frac.len() as u32))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(dec("3").to_string(), "3");
        assert_eq!(dec("3.50").to_string(), "3.5");
        assert_eq!(dec("0.05").to_string(), "0.05");
        assert_eq!(dec("-0.050").to_string(), "-0.05");
        assert_eq!(dec("120").to_string(), "120");
        assert_eq!(dec("000.000").to_string(), "0");
        assert!("".parse::<Decimal>().is_err());
        assert!("1.2.3".parse::<Decimal>().is_err());
    }

    #[test]
    fn normalized_equality() {
        assert_eq!(dec("1.50"), dec("1.5"));
        assert_eq!(dec("0.0"), dec("0"));
        assert_ne!(dec("1.5"), dec("1.05"));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(&dec("1") + &dec("2"), dec("3"));
        assert_eq!(&dec("0.1") + &dec("0.2"), dec("0.3"));
        assert_eq!(&dec("5") - &dec("1"), dec("4"));
        assert_eq!(&dec("2.5") * &dec("4"), dec("10"));
        assert_eq!(-dec("3"), dec("-3"));
    }

    #[test]
    fn division() {
        assert_eq!(dec("1").checked_div(&dec("4")), Some(dec("0.25")));
        assert_eq!(dec("120").checked_div(&dec("10")), Some(dec("12")));
        assert_eq!(dec("1").checked_div(&dec("0")), None);
        // non-terminating quotients truncate
        let third = dec("1").checked_div(&dec("3")).unwrap();
        assert_eq!(third.to_string().len(), 2 + DIV_PRECISION as usize);
    }

    #[test]
    fn power() {
        assert_eq!(dec("2").checked_pow(&dec("10")), Some(dec("1024")));
        assert_eq!(dec("2").checked_pow(&dec("0")), Some(dec("1")));
        assert_eq!(dec("2").checked_pow(&dec("-2")), Some(dec("0.25")));
        assert_eq!(dec("2").checked_pow(&dec("0.5")), None);
    }

    #[test]
    fn ordering() {
        assert!(dec("1.5") < dec("2"));
        assert!(dec("-1") < dec("0.5"));
        assert!(dec("10") > dec("9.999"));
    }

    #[test]
    fn integer_conversion() {
        assert_eq!(dec("42").to_i64(), Some(42));
        assert_eq!(dec("-3").to_i64(), Some(-3));
        assert_eq!(dec("1.5").to_i64(), None);
    }
}
