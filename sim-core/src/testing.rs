//! In-memory fakes for `BookChunkSource`/`PriceChunkSource`, used by unit tests across the
//! crate in place of the disk-backed `parquet_source` reader.

use crate::chunk_source::{BookChunkSource, BookRow, PriceChunkSource, PriceRow};
use crate::error::Result;

/// Fixed in-memory set of chunks for book-row tests. Each chunk is `(start_ts, end_ts, rows)`.
pub struct InMemoryBookSource {
    ranges: Vec<(i64, i64)>,
    chunks: Vec<Vec<BookRow>>,
}

impl InMemoryBookSource {
    pub fn new(chunks: Vec<(i64, i64, Vec<BookRow>)>) -> Self {
        let mut ranges = Vec::with_capacity(chunks.len());
        let mut rows = Vec::with_capacity(chunks.len());
        for (start, end, chunk_rows) in chunks {
            ranges.push((start, end));
            rows.push(chunk_rows);
        }
        Self { ranges, chunks: rows }
    }
}

impl BookChunkSource for InMemoryBookSource {
    fn chunk_ranges(&self) -> &[(i64, i64)] {
        &self.ranges
    }

    fn load_chunk(&mut self, idx: usize) -> Result<Vec<BookRow>> {
        Ok(self.chunks[idx].clone())
    }
}

/// Fixed in-memory set of chunks for scalar price-row tests.
pub struct InMemoryPriceSource {
    ranges: Vec<(i64, i64)>,
    chunks: Vec<Vec<PriceRow>>,
}

impl InMemoryPriceSource {
    pub fn new(chunks: Vec<(i64, i64, Vec<PriceRow>)>) -> Self {
        let mut ranges = Vec::with_capacity(chunks.len());
        let mut rows = Vec::with_capacity(chunks.len());
        for (start, end, chunk_rows) in chunks {
            ranges.push((start, end));
            rows.push(chunk_rows);
        }
        Self { ranges, chunks: rows }
    }
}

impl PriceChunkSource for InMemoryPriceSource {
    fn chunk_ranges(&self) -> &[(i64, i64)] {
        &self.ranges
    }

    fn load_chunk(&mut self, idx: usize) -> Result<Vec<PriceRow>> {
        Ok(self.chunks[idx].clone())
    }
}

/// A `DataSourceFactory` that hands back the same fixed row sets for every instrument
/// requested, used by `fixed_exchange` and by tests elsewhere in the crate that need a
/// whole `Exchange` rather than a bare chunk source.
pub struct FixedDataSourceFactory {
    pub book: Vec<BookRow>,
    pub mark: Vec<PriceRow>,
    pub index: Vec<PriceRow>,
}

impl crate::market_data::DataSourceFactory for FixedDataSourceFactory {
    fn book_source(&self, _inst_id: &str) -> Result<Box<dyn BookChunkSource>> {
        Ok(Box::new(InMemoryBookSource::new(vec![(0, i64::MAX / 2, self.book.clone())])))
    }
    fn mark_price_source(&self, _inst_id: &str) -> Result<Box<dyn PriceChunkSource>> {
        Ok(Box::new(InMemoryPriceSource::new(vec![(0, i64::MAX / 2, self.mark.clone())])))
    }
    fn index_price_source(&self, _inst_id: &str) -> Result<Box<dyn PriceChunkSource>> {
        Ok(Box::new(InMemoryPriceSource::new(vec![(0, i64::MAX / 2, self.index.clone())])))
    }
}

/// Builds a ready-to-use `Exchange` named `name` over fixed book/mark/index rows with a
/// single-currency initial balance, for tests in `event`/`environment`/`world`/`history`.
pub fn fixed_exchange(
    name: &str,
    book: Vec<BookRow>,
    mark: Vec<PriceRow>,
    index: Vec<PriceRow>,
    quote_balance: rust_decimal::Decimal,
) -> crate::exchange::Exchange {
    crate::exchange::Exchange::new(
        name,
        Box::new(FixedDataSourceFactory { book, mark, index }),
        10_000,
        1,
        [("USDT".to_string(), quote_balance)],
    )
    .expect("fixed_exchange construction must succeed in tests")
}
