//! Bid/offer quote arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::{Add, Div, Mul, Sub};

/// A two-sided quote with optional traded volume.
///
/// Every operator returns a new value; operands are never mutated. Adding or
/// subtracting another `Price` shifts both sides by the other's midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Price {
    /// Best bid
    pub bid: Decimal,
    /// Best offer
    pub offer: Decimal,
    /// Traded volume, if the feed provides it
    pub volume: Option<Decimal>,
}

impl Price {
    /// Create a quote without volume.
    pub fn new(bid: Decimal, offer: Decimal) -> Self {
        Self {
            bid,
            offer,
            volume: None,
        }
    }

    /// Create a single-valued quote (bid == offer).
    pub fn flat(value: Decimal) -> Self {
        Self::new(value, value)
    }

    /// Attach a traded volume.
    pub fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Midpoint of the quote.
    #[inline]
    pub fn mid(&self) -> Decimal {
        (self.bid + self.offer) / Decimal::TWO
    }

    /// The midpoint as a single-valued quote.
    pub fn mid_price(&self) -> Price {
        Price::flat(self.mid())
    }

    /// Offer minus bid.
    #[inline]
    pub fn spread(&self) -> Decimal {
        self.offer - self.bid
    }

    /// Volume, treating a missing value as zero.
    #[inline]
    pub fn volume_or_zero(&self) -> Decimal {
        self.volume.unwrap_or(Decimal::ZERO)
    }

    /// Absolute value of both sides.
    pub fn abs(&self) -> Price {
        Price {
            bid: self.bid.abs(),
            offer: self.offer.abs(),
            volume: self.volume,
        }
    }

    /// Total order by midpoint.
    ///
    /// Comparing bid and offer independently gives contradictory answers when
    /// they move in opposite directions, so quotes are ranked by midpoint only.
    pub fn cmp_mid(&self, other: &Price) -> Ordering {
        self.mid().cmp(&other.mid())
    }
}

impl Add<Decimal> for Price {
    type Output = Price;

    fn add(self, rhs: Decimal) -> Price {
        Price {
            bid: self.bid + rhs,
            offer: self.offer + rhs,
            volume: self.volume,
        }
    }
}

impl Sub<Decimal> for Price {
    type Output = Price;

    fn sub(self, rhs: Decimal) -> Price {
        Price {
            bid: self.bid - rhs,
            offer: self.offer - rhs,
            volume: self.volume,
        }
    }
}

impl Add<Price> for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        self + rhs.mid()
    }
}

impl Sub<Price> for Price {
    type Output = Price;

    fn sub(self, rhs: Price) -> Price {
        self - rhs.mid()
    }
}

impl Mul<Decimal> for Price {
    type Output = Price;

    fn mul(self, rhs: Decimal) -> Price {
        Price {
            bid: self.bid * rhs,
            offer: self.offer * rhs,
            volume: self.volume,
        }
    }
}

impl Div<Decimal> for Price {
    type Output = Price;

    fn div(self, rhs: Decimal) -> Price {
        Price {
            bid: self.bid / rhs,
            offer: self.offer / rhs,
            volume: self.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mid_and_spread() {
        let price = Price::new(dec!(100), dec!(101));
        assert_eq!(price.mid(), dec!(100.5));
        assert_eq!(price.spread(), dec!(1));
        assert_eq!(price.mid_price(), Price::flat(dec!(100.5)));
    }

    #[test]
    fn test_price_addition_uses_midpoint() {
        let a = Price::new(dec!(100), dec!(102));
        let b = Price::new(dec!(1), dec!(3));

        let sum = a + b;
        assert_eq!(sum.bid, dec!(102));
        assert_eq!(sum.offer, dec!(104));

        let diff = a - b;
        assert_eq!(diff.bid, dec!(98));
        assert_eq!(diff.offer, dec!(100));

        // Operands are untouched
        assert_eq!(a, Price::new(dec!(100), dec!(102)));
    }

    #[test]
    fn test_scalar_arithmetic_keeps_volume() {
        let price = Price::new(dec!(10), dec!(20)).with_volume(dec!(5));
        let scaled = price * dec!(2) / dec!(4);
        assert_eq!(scaled.bid, dec!(5));
        assert_eq!(scaled.offer, dec!(10));
        assert_eq!(scaled.volume, Some(dec!(5)));
    }

    #[test]
    fn test_abs() {
        let price = Price::new(dec!(-3), dec!(2));
        assert_eq!(price.abs(), Price::new(dec!(3), dec!(2)));
    }

    #[test]
    fn test_ordering_is_total_by_midpoint() {
        // Bid moves up while offer moves down: the midpoint decides.
        let a = Price::new(dec!(100), dec!(104));
        let b = Price::new(dec!(101), dec!(102));

        assert_eq!(a.cmp_mid(&b), Ordering::Greater);
        assert_eq!(b.cmp_mid(&a), Ordering::Less);
        assert_eq!(a.cmp_mid(&a), Ordering::Equal);

        let mut quotes = vec![a, b, Price::flat(dec!(99))];
        quotes.sort_by(|x, y| x.cmp_mid(y));
        assert_eq!(quotes[0], Price::flat(dec!(99)));
        assert_eq!(quotes[2], a);
    }
}
