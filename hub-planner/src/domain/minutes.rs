//! Edge durations in minutes.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// A non-negative, finite duration in minutes.
///
/// Edge weights are static averages, so fractional minutes are kept. The
/// ordering is total (`f64::total_cmp`), which lets `Minutes` sit in a
/// priority queue.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Minutes(f64);

impl Minutes {
    pub const ZERO: Minutes = Minutes(0.0);

    /// Create a duration, rejecting negative or non-finite values.
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() || value < 0.0 {
            return Err(DomainError::InvalidDuration(value));
        }
        Ok(Minutes(value))
    }

    /// Round a raw observed duration to one decimal place and floor it at
    /// `floor`.
    ///
    /// Raw durations at or below zero (and non-finite ones) become `floor`.
    ///
    /// ```
    /// use hub_planner::domain::Minutes;
    ///
    /// let floor = Minutes::new(0.5).unwrap();
    /// assert_eq!(Minutes::clamped(2.26, floor).get(), 2.3);
    /// assert_eq!(Minutes::clamped(-1.0, floor), floor);
    /// ```
    pub fn clamped(raw: f64, floor: Minutes) -> Self {
        if !raw.is_finite() {
            return floor;
        }
        let rounded = (raw * 10.0).round() / 10.0;
        if rounded <= 0.0 || rounded < floor.0 {
            floor
        } else {
            Minutes(rounded)
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Eq for Minutes {}

impl PartialOrd for Minutes {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Minutes {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add for Minutes {
    type Output = Minutes;

    fn add(self, rhs: Minutes) -> Minutes {
        Minutes(self.0 + rhs.0)
    }
}

impl TryFrom<f64> for Minutes {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Minutes::new(value)
    }
}

impl From<Minutes> for f64 {
    fn from(m: Minutes) -> f64 {
        m.0
    }
}

impl fmt::Debug for Minutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}min", self.0)
    }
}

impl fmt::Display for Minutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} min", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_nan() {
        assert!(Minutes::new(-0.1).is_err());
        assert!(Minutes::new(f64::NAN).is_err());
        assert!(Minutes::new(f64::INFINITY).is_err());
        assert!(Minutes::new(0.0).is_ok());
    }

    #[test]
    fn clamped_rounds_to_one_decimal() {
        let floor = Minutes::new(0.1).unwrap();
        assert_eq!(Minutes::clamped(2.24, floor).get(), 2.2);
        assert_eq!(Minutes::clamped(3.16, floor).get(), 3.2);
    }

    #[test]
    fn clamped_floors_non_positive() {
        let floor = Minutes::new(1.0).unwrap();
        assert_eq!(Minutes::clamped(0.0, floor), floor);
        assert_eq!(Minutes::clamped(-4.0, floor), floor);
        assert_eq!(Minutes::clamped(0.04, floor), floor);
        assert_eq!(Minutes::clamped(f64::NAN, floor), floor);
    }

    #[test]
    fn ordering_is_total() {
        let mut v = vec![
            Minutes::new(3.0).unwrap(),
            Minutes::ZERO,
            Minutes::new(1.5).unwrap(),
        ];
        v.sort();
        assert_eq!(v[0], Minutes::ZERO);
        assert_eq!(v[2].get(), 3.0);
    }

    #[test]
    fn addition() {
        let sum = Minutes::new(2.0).unwrap() + Minutes::new(3.5).unwrap();
        assert_eq!(sum.get(), 5.5);
    }
}
