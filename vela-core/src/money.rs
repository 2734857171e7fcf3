use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A monetary amount in integer minor units (cents).
///
/// Every price, total and fee in the system flows through this type.
/// Rate application and installment splits round half-up to whole cents,
/// so two-decimal display values are always exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Build from major and minor units: `from_major_minor(10, 99)` is $10.99.
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    pub const fn zero() -> Self {
        Money(0)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiply by a rate factor, rounding half-up to whole cents.
    ///
    /// `Money::from_cents(100_000).apply_rate(1.05)` is $1050.00.
    pub fn apply_rate(&self, rate: f64) -> Money {
        Money(round_half_up(self.0 as f64 * rate))
    }

    /// The given percentage of this amount, rounded half-up.
    pub fn percent_of(&self, pct: f64) -> Money {
        Money(round_half_up(self.0 as f64 * pct / 100.0))
    }

    /// One of `n` equal installments, rounded half-up to whole cents.
    pub fn split(&self, n: u32) -> Money {
        Money(round_half_up(self.0 as f64 / n as f64))
    }
}

// Half-up for the non-negative amounts used throughout; f64::round ties
// away from zero, which coincides with half-up for positives.
fn round_half_up(value: f64) -> i64 {
    value.round() as i64
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, qty: u32) -> Self {
        Money(self.0 * qty as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_display() {
        let price = Money::from_major_minor(10, 99);
        assert_eq!(price.cents(), 1099);
        assert_eq!(format!("{}", price), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        // $1000.00 at 5% interest
        let total = Money::from_major_minor(1000, 0).apply_rate(1.05);
        assert_eq!(total, Money::from_major_minor(1050, 0));

        // $1.50 at 5% is $1.575, which rounds up to $1.58
        assert_eq!(Money::from_cents(150).apply_rate(1.05).cents(), 158);
    }

    #[test]
    fn test_percent_of() {
        let total = Money::from_major_minor(250, 0);
        assert_eq!(total.percent_of(10.0), Money::from_major_minor(25, 0));
        assert_eq!(total.percent_of(0.0), Money::zero());
        assert_eq!(total.percent_of(100.0), total);
    }

    #[test]
    fn test_split_installments() {
        let total = Money::from_major_minor(1050, 0);
        assert_eq!(total.split(3), Money::from_major_minor(350, 0));

        // $100.00 in 3 installments of $33.33 (rounded)
        assert_eq!(Money::from_major_minor(100, 0).split(3).cents(), 3333);
    }
}
