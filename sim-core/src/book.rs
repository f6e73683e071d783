//! Per-instrument limit order book.
//!
//! `asks` is held ascending by price, `bids` descending; both are capped at `max_depth`.
//! Levels are located by binary search on price, so `set` is O(log n) to find plus O(n)
//! to shift on insert/remove (acceptable: books are bounded to a few hundred levels).

use rust_decimal::Decimal;

/// Which side of the book a row or fill applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
    Ask,
    Bid,
}

/// A single price level. Equality by price alone (`PartialEq`); `true_eq` additionally
/// compares size and count for callers that need a full-field comparison.
#[derive(Debug, Clone, Copy)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
    pub count: u64,
}

impl BookLevel {
    pub fn new(price: Decimal, size: Decimal, count: u64) -> Self {
        Self { price, size, count }
    }

    /// Price-only equality, used for locating/deduplicating levels.
    pub fn price_equals(&self, price: Decimal) -> bool {
        self.price == price
    }

    /// Full-tuple equality, used by `OrderBook`'s `PartialEq`.
    pub fn true_eq(&self, other: &BookLevel) -> bool {
        self.price == other.price && self.size == other.size && self.count == other.count
    }
}

/// Default depth cap .
pub const DEFAULT_MAX_DEPTH: usize = 400;

/// Ask and bid ladders for one instrument.
#[derive(Debug, Clone)]
pub struct OrderBook {
    asks: Vec<BookLevel>,
    bids: Vec<BookLevel>,
    max_depth: usize,
}

impl OrderBook {
    pub fn new(max_depth: usize) -> Self {
        Self { asks: Vec::new(), bids: Vec::new(), max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn asks(&self) -> &[BookLevel] {
        &self.asks
    }

    pub fn bids(&self) -> &[BookLevel] {
        &self.bids
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    /// `set(price, size, count)` : removes on `size == 0`, replaces an
    /// existing level in place, or inserts in sorted order and truncates to `max_depth`.
    pub fn set(&mut self, side: BookSide, price: Decimal, size: Decimal, count: u64) {
        match side {
            BookSide::Ask => Self::apply(&mut self.asks, price, size, count, self.max_depth, true),
            BookSide::Bid => Self::apply(&mut self.bids, price, size, count, self.max_depth, false),
        }
    }

    fn apply(
        levels: &mut Vec<BookLevel>,
        price: Decimal,
        size: Decimal,
        count: u64,
        max_depth: usize,
        ascending: bool,
    ) {
        let pos = levels.partition_point(|l| {
            if ascending {
                l.price < price
            } else {
                l.price > price
            }
        });
        let found = pos < levels.len() && levels[pos].price_equals(price);

        if size.is_zero() {
            if found {
                levels.remove(pos);
            }
            return;
        }

        if found {
            levels[pos] = BookLevel::new(price, size, count);
        } else if levels.len() < max_depth {
            levels.insert(pos, BookLevel::new(price, size, count));
        }
        // else: book is at max_depth and this price sorts past the retained tail; drop it.
        if levels.len() > max_depth {
            levels.truncate(max_depth);
        }
    }
}

impl PartialEq for OrderBook {
    fn eq(&self, other: &Self) -> bool {
        self.asks.len() == other.asks.len()
            && self.bids.len() == other.bids.len()
            && self.asks.iter().zip(&other.asks).all(|(a, b)| a.true_eq(b))
            && self.bids.iter().zip(&other.bids).all(|(a, b)| a.true_eq(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderBook {
        OrderBook::new(10)
    }

    #[test]
    fn asks_sort_ascending() {
        let mut b = book();
        b.set(BookSide::Ask, dec!(105), dec!(1), 1);
        b.set(BookSide::Ask, dec!(100), dec!(1), 1);
        b.set(BookSide::Ask, dec!(110), dec!(1), 1);
        let prices: Vec<_> = b.asks().iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![dec!(100), dec!(105), dec!(110)]);
    }

    #[test]
    fn bids_sort_descending() {
        let mut b = book();
        b.set(BookSide::Bid, dec!(95), dec!(1), 1);
        b.set(BookSide::Bid, dec!(100), dec!(1), 1);
        b.set(BookSide::Bid, dec!(90), dec!(1), 1);
        let prices: Vec<_> = b.bids().iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![dec!(100), dec!(95), dec!(90)]);
    }

    #[test]
    fn zero_size_removes_existing_level() {
        let mut b = book();
        b.set(BookSide::Ask, dec!(100), dec!(5), 1);
        assert_eq!(b.asks().len(), 1);
        b.set(BookSide::Ask, dec!(100), dec!(0), 0);
        assert_eq!(b.asks().len(), 0);
    }

    #[test]
    fn zero_size_on_absent_level_is_noop() {
        let mut b = book();
        b.set(BookSide::Ask, dec!(100), dec!(0), 0);
        assert!(b.asks().is_empty());
    }

    #[test]
    fn replaces_level_in_place() {
        let mut b = book();
        b.set(BookSide::Ask, dec!(100), dec!(5), 1);
        b.set(BookSide::Ask, dec!(100), dec!(9), 3);
        assert_eq!(b.asks().len(), 1);
        assert_eq!(b.asks()[0].size, dec!(9));
        assert_eq!(b.asks()[0].count, 3);
    }

    #[test]
    fn idempotent_set() {
        let mut b = book();
        b.set(BookSide::Bid, dec!(100), dec!(5), 2);
        let once = b.clone();
        b.set(BookSide::Bid, dec!(100), dec!(5), 2);
        assert_eq!(b, once);
    }

    #[test]
    fn depth_is_capped() {
        let mut b = OrderBook::new(3);
        for p in [100, 101, 102, 103, 104] {
            b.set(BookSide::Ask, Decimal::from(p), dec!(1), 1);
        }
        assert_eq!(b.asks().len(), 3);
        let prices: Vec<_> = b.asks().iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![Decimal::from(100), Decimal::from(101), Decimal::from(102)]);
    }

    #[test]
    fn ten_ask_levels_then_three_row_updates() {
        let mut b = OrderBook::new(DEFAULT_MAX_DEPTH);
        let prices = [100, 105, 110, 115, 120, 125, 130, 135, 140, 145];
        let sizes = [83, 19, 63, 10, 10, 53, 43, 47, 60, 47];
        let counts = [1u64, 3, 2, 9, 10, 8, 8, 6, 3, 5];
        for i in 0..prices.len() {
            b.set(BookSide::Ask, Decimal::from(prices[i]), Decimal::from(sizes[i]), counts[i]);
        }
        b.set(BookSide::Ask, dec!(100), dec!(69), 5);
        b.set(BookSide::Ask, dec!(110), dec!(0), 0);
        b.set(BookSide::Ask, dec!(140), dec!(70), 7);

        let expected_prices = [100, 105, 115, 120, 125, 130, 135, 140, 145];
        let expected_sizes = [69, 19, 10, 10, 53, 43, 47, 70, 47];
        assert_eq!(b.asks().len(), expected_prices.len());
        for (i, level) in b.asks().iter().enumerate() {
            assert_eq!(level.price, Decimal::from(expected_prices[i]));
            assert_eq!(level.size, Decimal::from(expected_sizes[i]));
        }
    }
}
