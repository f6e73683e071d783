//! Drives an `OrderBook` from a `BookChunkSource`, synchronised to simulation time.

use crate::book::{BookSide, OrderBook, DEFAULT_MAX_DEPTH};
use crate::chunk_source::{find_covering_chunk, BookChunkSource, RowAction};
use crate::error::{KernelError, Result};

/// Reconstructs one instrument's order book from chunked snapshot+update rows.
///
/// Holds at most one chunk's rows in memory at a time, re-fetched via `source.load_chunk` whenever the covering chunk changes.
pub struct BookReplay {
    source: Box<dyn BookChunkSource>,
    max_interval: i64,
    book: OrderBook,
    current_index: Option<usize>,
    current_ts: i64,
    rows: Vec<crate::chunk_source::BookRow>,
    chunked_index: usize,
}

impl BookReplay {
    pub fn new(source: Box<dyn BookChunkSource>, max_interval: i64) -> Self {
        Self {
            source,
            max_interval,
            book: OrderBook::new(DEFAULT_MAX_DEPTH),
            current_index: None,
            current_ts: -1,
            rows: Vec::new(),
            chunked_index: 0,
        }
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn current_ts(&self) -> i64 {
        self.current_ts
    }

    /// Advances the book to reflect every row with `timestamp <= clock`.
    pub fn update(&mut self, clock: i64) -> Result<()> {
        if self.current_ts == clock {
            return Ok(());
        }

        if self.reload_index_if_changed(clock)? {
            self.load_new_chunk()?;
        }

        if clock < self.current_ts {
            return Err(KernelError::ClockRegressed { current_ts: self.current_ts, requested_ts: clock });
        }

        while self.chunked_index < self.rows.len() && self.rows[self.chunked_index].timestamp <= clock {
            let row = self.rows[self.chunked_index];
            if self.current_ts != -1 && (row.timestamp - self.current_ts).abs() > self.max_interval {
                return Err(KernelError::DataGapExceeded {
                    last_ts: self.current_ts,
                    requested_ts: row.timestamp,
                    max_interval: self.max_interval,
                });
            }
            self.apply_row(row)?;
            self.current_ts = row.timestamp;
            self.chunked_index += 1;
        }

        self.current_ts = clock;
        Ok(())
    }

    fn reload_index_if_changed(&mut self, clock: i64) -> Result<bool> {
        let idx = find_covering_chunk(self.source.chunk_ranges(), clock);
        match idx {
            Some(i) if self.current_index != Some(i) => {
                self.current_index = Some(i);
                Ok(true)
            }
            Some(_) => Ok(false),
            None if self.current_index.is_none() => Err(KernelError::NoDataForTime { ts: clock }),
            None => Ok(false),
        }
    }

    fn load_new_chunk(&mut self) -> Result<()> {
        let idx = self.current_index.expect("reload_index_if_changed only returns true with Some(idx)");
        let rows = self.source.load_chunk(idx)?;
        let first = rows.first().ok_or_else(|| KernelError::MissingSnapshotHeader {
            chunk: format!("index {idx}"),
        })?;
        if first.action != RowAction::Snapshot {
            return Err(KernelError::MissingSnapshotHeader { chunk: format!("index {idx}") });
        }
        let initial_ts = first.timestamp;

        let mut chunked_index = 0;
        for row in &rows {
            if row.action != RowAction::Snapshot || row.timestamp != initial_ts {
                break;
            }
            self.apply_row(*row)?;
            chunked_index += 1;
        }

        self.rows = rows;
        self.chunked_index = chunked_index;
        self.current_ts = initial_ts;
        Ok(())
    }

    fn apply_row(&mut self, row: crate::chunk_source::BookRow) -> Result<()> {
        let side = match row.side {
            BookSide::Ask => BookSide::Ask,
            BookSide::Bid => BookSide::Bid,
        };
        self.book.set(side, row.price, row.size, row.count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryBookSource;
    use rust_decimal_macros::dec;

    fn row(ts: i64, action: RowAction, side: BookSide, price: i64, size: i64, count: u64) -> crate::chunk_source::BookRow {
        crate::chunk_source::BookRow {
            timestamp: ts,
            action,
            side,
            price: rust_decimal::Decimal::from(price),
            size: rust_decimal::Decimal::from(size),
            count,
        }
    }

    #[test]
    fn loads_snapshot_then_applies_updates() {
        let rows = vec![
            row(1000, RowAction::Snapshot, BookSide::Ask, 100, 10, 1),
            row(1000, RowAction::Snapshot, BookSide::Bid, 99, 10, 1),
            row(1100, RowAction::Update, BookSide::Ask, 100, 5, 1),
            row(1200, RowAction::Update, BookSide::Bid, 98, 3, 1),
        ];
        let source = InMemoryBookSource::new(vec![(1000, 2000, rows)]);
        let mut replay = BookReplay::new(Box::new(source), 2000);

        replay.update(1000).unwrap();
        assert_eq!(replay.book().best_ask().unwrap().size, dec!(10));

        replay.update(1150).unwrap();
        assert_eq!(replay.book().best_ask().unwrap().size, dec!(5));
        assert_eq!(replay.current_ts(), 1150);

        replay.update(1200).unwrap();
        assert_eq!(replay.book().bids().len(), 2);
    }

    #[test]
    fn fails_when_no_chunk_covers_clock() {
        let source = InMemoryBookSource::new(vec![(1000, 2000, vec![row(1000, RowAction::Snapshot, BookSide::Ask, 100, 1, 1)])]);
        let mut replay = BookReplay::new(Box::new(source), 2000);
        assert!(matches!(replay.update(5000), Err(KernelError::NoDataForTime { .. })));
    }

    #[test]
    fn fails_on_gap_exceeding_max_interval() {
        let rows = vec![
            row(1000, RowAction::Snapshot, BookSide::Ask, 100, 10, 1),
            row(5000, RowAction::Update, BookSide::Ask, 100, 5, 1),
        ];
        let source = InMemoryBookSource::new(vec![(1000, 9000, rows)]);
        let mut replay = BookReplay::new(Box::new(source), 100);
        assert!(matches!(replay.update(5000), Err(KernelError::DataGapExceeded { .. })));
    }

    #[test]
    fn switches_chunks_as_clock_advances() {
        let first = vec![row(1000, RowAction::Snapshot, BookSide::Ask, 100, 10, 1)];
        let second = vec![row(2000, RowAction::Snapshot, BookSide::Ask, 200, 20, 1)];
        let source = InMemoryBookSource::new(vec![(1000, 1999, first), (2000, 2999, second)]);
        let mut replay = BookReplay::new(Box::new(source), 2000);

        replay.update(1500).unwrap();
        assert_eq!(replay.book().best_ask().unwrap().price, dec!(100));

        replay.update(2500).unwrap();
        assert_eq!(replay.book().best_ask().unwrap().price, dec!(200));
    }
}
