//! # Rational Numbers
//!
//! Exact fractions for every duration and timestamp in the engine.
//!
//! ## Purpose
//! Musical time is made of ratios (a dotted eighth is 3/16 of a whole note, a
//! triplet quarter is 1/6), so durations are never stored as floating point.
//! [`Rational`] wraps an arbitrary-precision `BigRational` and adds one extra
//! state, **non-finite**, which is what a division by zero produces and what
//! the rest of the engine uses for "no duration" (non-rhythmic tokens,
//! fields that have not been analyzed yet).
//!
//! ## Arithmetic Rules
//! - Results are always in lowest terms with a positive denominator.
//! - Any operation with a non-finite operand is non-finite.
//! - Dividing by zero is non-finite; it never panics.
//! - Non-finite values are equal to each other but unordered against finite ones.
//!
//! ## Example
//! ```rust
//! use humdrum::Rational;
//!
//! let dotted_quarter = Rational::new(3, 8);
//! let eighth = Rational::new(1, 8);
//! assert_eq!(&dotted_quarter + &eighth, Rational::new(1, 2));
//! assert!(!(Rational::one() / Rational::zero()).is_finite());
//! assert_eq!(Rational::new(3, 2).to_mixed_string("_"), "1_1/2");
//! ```
//!
//! ## Related Modules
//! - `rhythm` - Converts recip strings into `Rational` durations

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// An exact fraction, or the non-finite sentinel.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    value: Option<BigRational>,
}

/// Error returned when a string is not of the form `n` or `n/d`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid rational number: '{0}'")]
pub struct ParseRationalError(pub String);

impl Rational {
    /// Build `numerator/denominator`; a zero denominator yields the non-finite value.
    pub fn new(numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self::non_finite();
        }
        Self {
            value: Some(BigRational::new(numerator.into(), denominator.into())),
        }
    }

    pub fn from_integer(value: i64) -> Self {
        Self {
            value: Some(BigRational::from_integer(value.into())),
        }
    }

    pub fn zero() -> Self {
        Self {
            value: Some(BigRational::zero()),
        }
    }

    pub fn one() -> Self {
        Self {
            value: Some(BigRational::one()),
        }
    }

    /// The undefined value (result of dividing by zero).
    pub fn non_finite() -> Self {
        Self { value: None }
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_zero(&self) -> bool {
        self.value.as_ref().map_or(false, |v| v.is_zero())
    }

    pub fn is_positive(&self) -> bool {
        self.value.as_ref().map_or(false, |v| v.is_positive())
    }

    pub fn is_negative(&self) -> bool {
        self.value.as_ref().map_or(false, |v| v.is_negative())
    }

    /// True for finite values `>= 0`.
    pub fn is_non_negative(&self) -> bool {
        self.value.as_ref().map_or(false, |v| !v.is_negative())
    }

    /// True for finite values `<= 0`.
    pub fn is_non_positive(&self) -> bool {
        self.value.as_ref().map_or(false, |v| !v.is_positive())
    }

    pub fn is_integer(&self) -> bool {
        self.value.as_ref().map_or(false, |v| v.is_integer())
    }

    /// Numerator in lowest terms, if finite and representable as `i64`.
    pub fn numerator(&self) -> Option<i64> {
        self.value.as_ref().and_then(|v| v.numer().to_i64())
    }

    /// Denominator in lowest terms (always positive), if finite and representable as `i64`.
    pub fn denominator(&self) -> Option<i64> {
        self.value.as_ref().and_then(|v| v.denom().to_i64())
    }

    pub fn abs(&self) -> Rational {
        Self {
            value: self.value.as_ref().map(|v| v.abs()),
        }
    }

    /// Floating-point approximation; NaN for the non-finite value.
    pub fn to_f64(&self) -> f64 {
        match &self.value {
            Some(v) => {
                let numer = v.numer().to_f64().unwrap_or(f64::NAN);
                let denom = v.denom().to_f64().unwrap_or(f64::NAN);
                numer / denom
            }
            None => f64::NAN,
        }
    }

    /// Mixed-fraction form: `3/2` prints as `1_1/2` with a `"_"` separator.
    ///
    /// Values whose magnitude is below one, and integers, print the same as
    /// [`fmt::Display`].
    pub fn to_mixed_string(&self, separator: &str) -> String {
        let value = match &self.value {
            Some(v) => v,
            None => return self.to_string(),
        };
        if value.is_integer() || value.abs() < BigRational::one() {
            return self.to_string();
        }
        let sign = if value.is_negative() { "-" } else { "" };
        let magnitude = value.abs();
        let whole = magnitude.trunc();
        let remainder = magnitude - &whole;
        format!("{}{}{}{}", sign, whole, separator, remainder)
    }

    /// Decimal form with a fixed number of places.
    pub fn to_decimal_string(&self, places: usize) -> String {
        if !self.is_finite() {
            return self.to_string();
        }
        format!("{:.*}", places, self.to_f64())
    }

    /// `self` if finite, otherwise `fallback`.
    pub fn or(self, fallback: Rational) -> Rational {
        if self.is_finite() {
            self
        } else {
            fallback
        }
    }

    fn combine<F>(lhs: &Rational, rhs: &Rational, op: F) -> Rational
    where
        F: FnOnce(&BigRational, &BigRational) -> Option<BigRational>,
    {
        let value = match (&lhs.value, &rhs.value) {
            (Some(a), Some(b)) => op(a, b),
            _ => None,
        };
        Rational { value }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "undefined"),
        }
    }
}

impl FromStr for Rational {
    type Err = ParseRationalError;

    /// Parses `n` or `n/d`. A zero denominator parses to the non-finite value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if let Some((numer, denom)) = text.split_once('/') {
            if denom.trim() == "0" && numer.trim().parse::<i64>().is_ok() {
                return Ok(Self::non_finite());
            }
        }
        text.parse::<BigRational>()
            .map(|value| Self { value: Some(value) })
            .map_err(|_| ParseRationalError(s.to_string()))
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            (None, None) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl Serialize for Rational {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<&Rational> for &Rational {
            type Output = Rational;
            fn $method(self, rhs: &Rational) -> Rational {
                Rational::combine(self, rhs, $op)
            }
        }

        impl $trait<Rational> for Rational {
            type Output = Rational;
            fn $method(self, rhs: Rational) -> Rational {
                (&self).$method(&rhs)
            }
        }

        impl $trait<&Rational> for Rational {
            type Output = Rational;
            fn $method(self, rhs: &Rational) -> Rational {
                (&self).$method(rhs)
            }
        }

        impl $trait<Rational> for &Rational {
            type Output = Rational;
            fn $method(self, rhs: Rational) -> Rational {
                self.$method(&rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, |a: &BigRational, b: &BigRational| Some(a + b));
impl_binary_op!(Sub, sub, |a: &BigRational, b: &BigRational| Some(a - b));
impl_binary_op!(Mul, mul, |a: &BigRational, b: &BigRational| Some(a * b));
impl_binary_op!(Div, div, |a: &BigRational, b: &BigRational| {
    if b.is_zero() {
        None
    } else {
        Some(a / b)
    }
});

impl AddAssign<&Rational> for Rational {
    fn add_assign(&mut self, rhs: &Rational) {
        *self = &*self + rhs;
    }
}

impl AddAssign<Rational> for Rational {
    fn add_assign(&mut self, rhs: Rational) {
        *self = &*self + &rhs;
    }
}

impl SubAssign<&Rational> for Rational {
    fn sub_assign(&mut self, rhs: &Rational) {
        *self = &*self - rhs;
    }
}

impl SubAssign<Rational> for Rational {
    fn sub_assign(&mut self, rhs: Rational) {
        *self = &*self - &rhs;
    }
}

impl Neg for &Rational {
    type Output = Rational;
    fn neg(self) -> Rational {
        Rational {
            value: self.value.as_ref().map(|v| -v),
        }
    }
}

impl Neg for Rational {
    type Output = Rational;
    fn neg(self) -> Rational {
        -&self
    }
}

/// Least common multiple of two positive integers.
pub(crate) fn lcm(a: u64, b: u64) -> u64 {
    fn gcd(mut a: u64, mut b: u64) -> u64 {
        while b != 0 {
            let t = a % b;
            a = b;
            b = t;
        }
        a
    }
    if a == 0 || b == 0 {
        return a.max(b);
    }
    a / gcd(a, b) * b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduced_to_lowest_terms() {
        let r = Rational::new(6, -8);
        assert_eq!(r.numerator(), Some(-3));
        assert_eq!(r.denominator(), Some(4));
        assert_eq!(r, Rational::new(-3, 4));
    }

    #[test]
    fn test_arithmetic() {
        let a = Rational::new(1, 4);
        let b = Rational::new(1, 6);
        assert_eq!(&a + &b, Rational::new(5, 12));
        assert_eq!(&a - &b, Rational::new(1, 12));
        assert_eq!(&a * &b, Rational::new(1, 24));
        assert_eq!(&a / &b, Rational::new(3, 2));
        assert_eq!(-a, Rational::new(-1, 4));
    }

    #[test]
    fn test_assign_ops() {
        let mut sum = Rational::zero();
        sum += Rational::new(1, 8);
        sum += &Rational::new(3, 8);
        assert_eq!(sum, Rational::new(1, 2));
        sum -= Rational::new(1, 2);
        assert!(sum.is_zero());
    }

    #[test]
    fn test_division_by_zero_is_non_finite() {
        let r = Rational::one() / Rational::zero();
        assert!(!r.is_finite());
        assert!(!Rational::new(5, 0).is_finite());
        assert_eq!(r.numerator(), None);
    }

    #[test]
    fn test_non_finite_is_contagious() {
        let bad = Rational::non_finite();
        assert!(!(&bad + &Rational::one()).is_finite());
        assert!(!(&Rational::one() * &bad).is_finite());
        assert!(!(-&bad).is_finite());
        assert!(!bad.is_zero());
        assert!(!bad.is_positive());
        assert!(!bad.is_negative());
        assert!(!bad.is_non_negative());
    }

    #[test]
    fn test_ordering() {
        assert!(Rational::new(1, 3) < Rational::new(1, 2));
        assert!(Rational::new(-1, 2) < Rational::zero());
        assert_eq!(
            Rational::non_finite().partial_cmp(&Rational::one()),
            None
        );
        assert_eq!(Rational::non_finite(), Rational::non_finite());
    }

    #[test]
    fn test_predicates() {
        assert!(Rational::zero().is_non_negative());
        assert!(Rational::zero().is_non_positive());
        assert!(Rational::new(4, 2).is_integer());
        assert!(!Rational::new(3, 2).is_integer());
        assert!(Rational::new(-1, 7).is_negative());
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Rational::new(3, 2).to_string(), "3/2");
        assert_eq!(Rational::new(4, 2).to_string(), "2");
        assert_eq!(Rational::new(7, 4).to_mixed_string("_"), "1_3/4");
        assert_eq!(Rational::new(-7, 4).to_mixed_string("_"), "-1_3/4");
        assert_eq!(Rational::new(3, 4).to_mixed_string("_"), "3/4");
        assert_eq!(Rational::new(1, 4).to_decimal_string(2), "0.25");
        assert_eq!(Rational::non_finite().to_string(), "undefined");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("3/6".parse::<Rational>(), Ok(Rational::new(1, 2)));
        assert_eq!("-5".parse::<Rational>(), Ok(Rational::from_integer(-5)));
        assert!(!"1/0".parse::<Rational>().map(|r| r.is_finite()).unwrap_or(true));
        assert!("abc".parse::<Rational>().is_err());
    }

    #[test]
    fn test_large_values_stay_exact() {
        let mut total = Rational::zero();
        for _ in 0..64 {
            total += Rational::new(i64::MAX, 3);
        }
        let expected = &Rational::new(i64::MAX, 3) * &Rational::from_integer(64);
        assert_eq!(total, expected);
        assert_eq!(total.numerator(), None);
    }

    #[test]
    fn test_lcm() {
        assert_eq!(lcm(4, 6), 12);
        assert_eq!(lcm(0, 5), 5);
        assert_eq!(lcm(1, 1), 1);
    }
}
