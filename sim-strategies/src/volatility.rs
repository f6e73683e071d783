//! Rolling mid-price volatility over a fixed-capacity ring buffer, in `Decimal`, for
//! strategies that want to shrink order size in choppy markets.

use std::collections::VecDeque;

use rust_decimal::{Decimal, MathematicalOps};

/// Sample standard deviation of the last `capacity` mid-price returns.
pub struct RollingVolatility {
    capacity: usize,
    prices: VecDeque<Decimal>,
}

impl RollingVolatility {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "RollingVolatility needs at least two samples to compute a return");
        Self { capacity, prices: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, price: Decimal) {
        if self.prices.len() == self.capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    /// `None` until at least two prices (one return) have been observed.
    pub fn volatility(&self) -> Option<Decimal> {
        if self.prices.len() < 2 {
            return None;
        }
        let returns: Vec<Decimal> = self
            .prices
            .iter()
            .zip(self.prices.iter().skip(1))
            .filter(|(prev, _)| !prev.is_zero())
            .map(|(prev, cur)| (*cur - *prev) / *prev)
            .collect();
        if returns.is_empty() {
            return Some(Decimal::ZERO);
        }
        let n = Decimal::from(returns.len() as i64);
        let mean = returns.iter().sum::<Decimal>() / n;
        let variance = returns.iter().map(|r| (*r - mean) * (*r - mean)).sum::<Decimal>() / n;
        Some(variance.sqrt().unwrap_or(Decimal::ZERO))
    }

    /// Scales `base_size` down as volatility rises: `base_size / (1 + volatility * k)`.
    pub fn scale_order_size(&self, base_size: Decimal, sensitivity: Decimal) -> Decimal {
        match self.volatility() {
            Some(vol) if !vol.is_zero() => base_size / (Decimal::ONE + vol * sensitivity),
            _ => base_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reports_none_before_two_samples() {
        let mut vol = RollingVolatility::new(4);
        assert_eq!(vol.volatility(), None);
        vol.push(dec!(100));
        assert_eq!(vol.volatility(), None);
    }

    #[test]
    fn zero_volatility_for_constant_prices() {
        let mut vol = RollingVolatility::new(4);
        for _ in 0..4 {
            vol.push(dec!(100));
        }
        assert_eq!(vol.volatility(), Some(Decimal::ZERO));
    }

    #[test]
    fn evicts_oldest_sample_beyond_capacity() {
        let mut vol = RollingVolatility::new(2);
        vol.push(dec!(100));
        vol.push(dec!(200));
        vol.push(dec!(200)); // evicts the 100 sample; only one flat return remains
        assert_eq!(vol.volatility(), Some(Decimal::ZERO));
    }

    #[test]
    fn higher_volatility_shrinks_order_size_more() {
        let mut calm = RollingVolatility::new(4);
        for p in [dec!(100), dec!(100), dec!(100)] {
            calm.push(p);
        }
        let mut choppy = RollingVolatility::new(4);
        for p in [dec!(100), dec!(110), dec!(90)] {
            choppy.push(p);
        }
        let calm_size = calm.scale_order_size(dec!(1), dec!(10));
        let choppy_size = choppy.scale_order_size(dec!(1), dec!(10));
        assert!(choppy_size < calm_size);
    }

    proptest! {
        /// However volatile the price history, scaling never produces a non-positive
        /// size and never scales a positive base size up.
        #[test]
        fn scaled_size_stays_within_base_bounds(
            prices in proptest::collection::vec(1i64..100_000, 2..20),
            sensitivity in 0i64..1_000,
        ) {
            let mut vol = RollingVolatility::new(20);
            for p in prices {
                vol.push(Decimal::from(p));
            }
            let base = dec!(1);
            let scaled = vol.scale_order_size(base, Decimal::from(sensitivity));
            prop_assert!(scaled > Decimal::ZERO);
            prop_assert!(scaled <= base);
        }
    }
}
