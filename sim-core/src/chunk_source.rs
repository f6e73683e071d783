//! Trait seam over chunked, timestamp-ordered historical data.
//!
//! The kernel depends only on these traits; `parquet_source` provides the disk-backed
//! implementation and `testing` an in-memory fake. Neither `BookReplay` nor `PricePoint`
//! know or care which one is behind the trait object.

use rust_decimal::Decimal;

use crate::book::BookSide;
use crate::error::Result;

/// One row of a book chunk: a snapshot or incremental update to a single level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Snapshot,
    Update,
}

#[derive(Debug, Clone, Copy)]
pub struct BookRow {
    pub timestamp: i64,
    pub action: RowAction,
    pub side: BookSide,
    pub price: Decimal,
    pub size: Decimal,
    pub count: u64,
}

/// One row of a mark/index price chunk. `value = None` models a null cell.
#[derive(Debug, Clone, Copy)]
pub struct PriceRow {
    pub timestamp: i64,
    pub value: Option<Decimal>,
}

/// A chunked source of book rows for one instrument, addressed by `[start_ts, end_ts]`
/// ranges parsed from the `part-<seq>-<startTs>-<endTs>` filename convention.
///
/// Object-safe by design (no associated types, no generics) so `MarketData` can hold
/// `Box<dyn BookChunkSource>` per instrument without parameterizing the whole kernel.
pub trait BookChunkSource {
    /// `(start_ts, end_ts)` for every chunk, in filename-discovery order (not necessarily
    /// sorted by time — callers must search, not assume sortedness).
    fn chunk_ranges(&self) -> &[(i64, i64)];

    /// Loads the full row set for chunk `idx`. Rows must already be within
    /// `chunk_ranges()[idx]` and sorted non-decreasing by `timestamp`, first row a snapshot.
    fn load_chunk(&mut self, idx: usize) -> Result<Vec<BookRow>>;
}

/// A chunked source of scalar price rows (mark price / index price) for one instrument.
pub trait PriceChunkSource {
    fn chunk_ranges(&self) -> &[(i64, i64)];

    /// Loads the full row set for chunk `idx`, sorted non-decreasing by `timestamp`.
    fn load_chunk(&mut self, idx: usize) -> Result<Vec<PriceRow>>;
}

/// Locates the unique chunk covering `ts`, mirroring `_update_index`.
///
/// Returns `Some(idx)` when found. Does not itself raise `NoDataForTime` — callers decide
/// whether "no covering chunk and nothing loaded yet" is fatal, since `PricePoint` and
/// `BookReplay` share this helper but differ slightly in when that's true.
pub fn find_covering_chunk(ranges: &[(i64, i64)], ts: i64) -> Option<usize> {
    ranges.iter().position(|&(start, end)| start <= ts && ts <= end)
}
