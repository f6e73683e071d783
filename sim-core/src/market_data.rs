//! Typed, lazily-populated bundle of per-instrument readers: `markData.books()` and
//! friends, rather than a dynamic string-keyed dispatcher.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::book::OrderBook;
use crate::book_replay::BookReplay;
use crate::chunk_source::{BookChunkSource, PriceChunkSource};
use crate::error::Result;
use crate::mid_price_tracker::MidPriceTracker;
use crate::price_point::PricePoint;

/// Produces fresh chunk sources for one instrument on first use. `parquet_source`
/// provides the disk-backed implementation; tests construct ad-hoc in-memory factories.
pub trait DataSourceFactory {
    fn book_source(&self, inst_id: &str) -> Result<Box<dyn BookChunkSource>>;
    fn mark_price_source(&self, inst_id: &str) -> Result<Box<dyn PriceChunkSource>>;
    fn index_price_source(&self, inst_id: &str) -> Result<Box<dyn PriceChunkSource>>;
}

/// Holds one `BookReplay`/`PricePoint`/`MidPriceTracker` per instrument touched so far,
/// created on first access via the `DataSourceFactory`.
pub struct MarketData {
    factory: Box<dyn DataSourceFactory>,
    max_interval: i64,
    mid_window: usize,
    books: HashMap<String, BookReplay>,
    mark_prices: HashMap<String, PricePoint>,
    index_prices: HashMap<String, PricePoint>,
    mid_prices: HashMap<String, MidPriceTracker>,
}

impl MarketData {
    pub fn new(factory: Box<dyn DataSourceFactory>, max_interval: i64, mid_window: usize) -> Self {
        Self {
            factory,
            max_interval,
            mid_window,
            books: HashMap::new(),
            mark_prices: HashMap::new(),
            index_prices: HashMap::new(),
            mid_prices: HashMap::new(),
        }
    }

    pub fn book(&mut self, inst_id: &str, clock: i64) -> Result<&OrderBook> {
        if !self.books.contains_key(inst_id) {
            let source = self.factory.book_source(inst_id)?;
            self.books.insert(inst_id.to_string(), BookReplay::new(source, self.max_interval));
        }
        let replay = self.books.get_mut(inst_id).expect("just inserted");
        replay.update(clock)?;
        Ok(replay.book())
    }

    pub fn mark_price(&mut self, inst_id: &str, clock: i64) -> Result<Decimal> {
        if !self.mark_prices.contains_key(inst_id) {
            let source = self.factory.mark_price_source(inst_id)?;
            self.mark_prices.insert(inst_id.to_string(), PricePoint::new(source, self.max_interval));
        }
        self.mark_prices.get_mut(inst_id).expect("just inserted").now(clock)
    }

    pub fn index_price(&mut self, inst_id: &str, clock: i64) -> Result<Decimal> {
        if !self.index_prices.contains_key(inst_id) {
            let source = self.factory.index_price_source(inst_id)?;
            self.index_prices.insert(inst_id.to_string(), PricePoint::new(source, self.max_interval));
        }
        self.index_prices.get_mut(inst_id).expect("just inserted").now(clock)
    }

    /// Fallback mark price, sampled from the book's top-of-book midpoint, for
    /// instruments with no dedicated mark-price feed.
    pub fn mid_price(&mut self, inst_id: &str, clock: i64) -> Result<Decimal> {
        if !self.mid_prices.contains_key(inst_id) {
            let source = self.factory.book_source(inst_id)?;
            self.mid_prices.insert(
                inst_id.to_string(),
                MidPriceTracker::new(source, self.mid_window, self.max_interval),
            );
        }
        self.mid_prices.get_mut(inst_id).expect("just inserted").now(clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookSide;
    use crate::chunk_source::{BookRow, PriceRow, RowAction};
    use crate::testing::{InMemoryBookSource, InMemoryPriceSource};
    use rust_decimal_macros::dec;

    struct FixedFactory;

    fn book_rows() -> Vec<BookRow> {
        vec![
            BookRow { timestamp: 1000, action: RowAction::Snapshot, side: BookSide::Ask, price: dec!(102), size: dec!(1), count: 1 },
            BookRow { timestamp: 1000, action: RowAction::Snapshot, side: BookSide::Bid, price: dec!(98), size: dec!(1), count: 1 },
        ]
    }

    fn price_rows(value: Decimal) -> Vec<PriceRow> {
        vec![PriceRow { timestamp: 1000, value: Some(value) }]
    }

    impl DataSourceFactory for FixedFactory {
        fn book_source(&self, _inst_id: &str) -> Result<Box<dyn BookChunkSource>> {
            Ok(Box::new(InMemoryBookSource::new(vec![(1000, 2000, book_rows())])))
        }
        fn mark_price_source(&self, _inst_id: &str) -> Result<Box<dyn PriceChunkSource>> {
            Ok(Box::new(InMemoryPriceSource::new(vec![(1000, 2000, price_rows(dec!(100)))])))
        }
        fn index_price_source(&self, _inst_id: &str) -> Result<Box<dyn PriceChunkSource>> {
            Ok(Box::new(InMemoryPriceSource::new(vec![(1000, 2000, price_rows(dec!(99)))])))
        }
    }

    #[test]
    fn lazily_creates_and_caches_readers_per_instrument() {
        let mut md = MarketData::new(Box::new(FixedFactory), 2000, 1);
        assert_eq!(md.book("BTC-USDT", 1000).unwrap().best_ask().unwrap().price, dec!(102));
        assert_eq!(md.mark_price("BTC-USDT", 1000).unwrap(), dec!(100));
        assert_eq!(md.index_price("BTC-USDT", 1000).unwrap(), dec!(99));
        assert_eq!(md.mid_price("BTC-USDT", 1000).unwrap(), dec!(100));
    }
}
