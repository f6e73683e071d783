//! Disk-backed `ChunkSource` over a simple on-disk layout:
//! `<root>/{books,markprices,indexprices}/<instId>/part-<seq>-<startTs>-<endTs>.parquet`.
//!
//! Parquet I/O is an external collaborator. This module is the
//! concrete adapter that makes the crate runnable end to end; the kernel's own tests
//! exercise `BookChunkSource`/`PriceChunkSource` exclusively through the in-memory fakes
//! in `testing`, never through this file.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, Float64Array, Int64Array, StringArray, UInt64Array};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::book::BookSide;
use crate::chunk_source::{BookChunkSource, BookRow, PriceChunkSource, PriceRow, RowAction};
use crate::error::{KernelError, Result};
use crate::market_data::DataSourceFactory;

/// Parses `part-<seq>-<startTs>-<endTs>.parquet`, returning `(seq, start_ts, end_ts)`.
fn parse_chunk_filename(path: &Path) -> Option<(u64, i64, i64)> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.split('-');
    if parts.next()? != "part" {
        return None;
    }
    let seq: u64 = parts.next()?.parse().ok()?;
    let start: i64 = parts.next()?.parse().ok()?;
    let end: i64 = parts.next()?.parse().ok()?;
    Some((seq, start, end))
}

/// Every `part-*.parquet` file directly under `dir`, sorted by the `seq` embedded in its
/// filename.
fn discover_chunks(dir: &Path) -> Result<Vec<(PathBuf, i64, i64)>> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| KernelError::MalformedRow {
        detail: format!("cannot read chunk directory {}: {e}", dir.display()),
    })?;

    let mut found = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| KernelError::MalformedRow { detail: e.to_string() })?;
        let path = entry.path();
        if let Some((seq, start, end)) = parse_chunk_filename(&path) {
            found.push((seq, path, start, end));
        }
    }
    found.sort_by_key(|(seq, ..)| *seq);
    Ok(found.into_iter().map(|(_, path, start, end)| (path, start, end)).collect())
}

fn read_batches(path: &Path) -> Result<Vec<arrow::record_batch::RecordBatch>> {
    let file = File::open(path)
        .map_err(|e| KernelError::MalformedRow { detail: format!("cannot open {}: {e}", path.display()) })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| KernelError::MalformedRow { detail: format!("{}: {e}", path.display()) })?
        .build()
        .map_err(|e| KernelError::MalformedRow { detail: format!("{}: {e}", path.display()) })?;
    reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| KernelError::MalformedRow { detail: format!("{}: {e}", path.display()) })
}

fn column_i64(batch: &arrow::record_batch::RecordBatch, name: &str) -> Result<Int64Array> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| KernelError::MalformedRow { detail: format!("missing column {name}") })?;
    col.as_any()
        .downcast_ref::<Int64Array>()
        .cloned()
        .ok_or_else(|| KernelError::MalformedRow { detail: format!("column {name} is not int64") })
}

fn column_f64(batch: &arrow::record_batch::RecordBatch, name: &str) -> Result<Float64Array> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| KernelError::MalformedRow { detail: format!("missing column {name}") })?;
    col.as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| KernelError::MalformedRow { detail: format!("column {name} is not float64") })
}

fn column_str(batch: &arrow::record_batch::RecordBatch, name: &str) -> Result<StringArray> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| KernelError::MalformedRow { detail: format!("missing column {name}") })?;
    col.as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| KernelError::MalformedRow { detail: format!("column {name} is not utf8") })
}

fn decimal_from_f64(v: f64) -> Result<Decimal> {
    Decimal::from_f64(v).ok_or_else(|| KernelError::MalformedRow { detail: format!("non-finite value {v}") })
}

fn book_rows_from_file(path: &Path) -> Result<Vec<BookRow>> {
    let mut rows = Vec::new();
    for batch in read_batches(path)? {
        let ts = column_i64(&batch, "timestamp")?;
        let action = column_str(&batch, "action")?;
        let side = column_str(&batch, "side")?;
        let price = column_f64(&batch, "price")?;
        let size = column_f64(&batch, "size")?;
        let count = {
            let col = batch
                .column_by_name("numOrders")
                .ok_or_else(|| KernelError::MalformedRow { detail: "missing column numOrders".into() })?;
            col.as_any()
                .downcast_ref::<UInt64Array>()
                .cloned()
                .ok_or_else(|| KernelError::MalformedRow { detail: "column numOrders is not uint64".into() })?
        };

        for i in 0..batch.num_rows() {
            let action = match action.value(i) {
                "snapshot" => RowAction::Snapshot,
                "update" => RowAction::Update,
                other => {
                    return Err(KernelError::MalformedRow { detail: format!("unknown action {other}") })
                }
            };
            let side = match side.value(i) {
                "ask" => BookSide::Ask,
                "bid" => BookSide::Bid,
                other => return Err(KernelError::MalformedRow { detail: format!("unknown side {other}") }),
            };
            rows.push(BookRow {
                timestamp: ts.value(i),
                action,
                side,
                price: decimal_from_f64(price.value(i))?,
                size: decimal_from_f64(size.value(i))?,
                count: count.value(i),
            });
        }
    }
    Ok(rows)
}

fn price_rows_from_file(path: &Path) -> Result<Vec<PriceRow>> {
    let mut rows = Vec::new();
    for batch in read_batches(path)? {
        let ts = column_i64(&batch, "timestamp")?;
        let value_col = batch
            .column_by_name("value")
            .ok_or_else(|| KernelError::MalformedRow { detail: "missing column value".into() })?;
        let value = value_col
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| KernelError::MalformedRow { detail: "column value is not float64".into() })?;

        for i in 0..batch.num_rows() {
            let value = if value.is_null(i) { None } else { Some(decimal_from_f64(value.value(i))?) };
            rows.push(PriceRow { timestamp: ts.value(i), value });
        }
    }
    Ok(rows)
}

/// One instrument's chunk index plus its parsed `(start, end)` ranges, shared by the
/// book/mark/index adapters below.
struct FileChunkSource<Row> {
    chunks: Vec<(PathBuf, i64, i64)>,
    ranges: Vec<(i64, i64)>,
    load: fn(&Path) -> Result<Vec<Row>>,
}

impl<Row> FileChunkSource<Row> {
    fn new(dir: PathBuf, load: fn(&Path) -> Result<Vec<Row>>) -> Result<Self> {
        let chunks = discover_chunks(&dir)?;
        let ranges = chunks.iter().map(|(_, start, end)| (*start, *end)).collect();
        Ok(Self { chunks, ranges, load })
    }
}

impl BookChunkSource for FileChunkSource<BookRow> {
    fn chunk_ranges(&self) -> &[(i64, i64)] {
        &self.ranges
    }

    fn load_chunk(&mut self, idx: usize) -> Result<Vec<BookRow>> {
        (self.load)(&self.chunks[idx].0)
    }
}

impl PriceChunkSource for FileChunkSource<PriceRow> {
    fn chunk_ranges(&self) -> &[(i64, i64)] {
        &self.ranges
    }

    fn load_chunk(&mut self, idx: usize) -> Result<Vec<PriceRow>> {
        (self.load)(&self.chunks[idx].0)
    }
}

/// `DataSourceFactory` rooted at `<root>`.
pub struct ParquetDataSourceFactory {
    root: PathBuf,
}

impl ParquetDataSourceFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn inst_dir(&self, kind: &str, inst_id: &str) -> PathBuf {
        self.root.join(kind).join(inst_id)
    }
}

impl DataSourceFactory for ParquetDataSourceFactory {
    fn book_source(&self, inst_id: &str) -> Result<Box<dyn BookChunkSource>> {
        Ok(Box::new(FileChunkSource::new(self.inst_dir("books", inst_id), book_rows_from_file)?))
    }

    fn mark_price_source(&self, inst_id: &str) -> Result<Box<dyn PriceChunkSource>> {
        Ok(Box::new(FileChunkSource::new(self.inst_dir("markprices", inst_id), price_rows_from_file)?))
    }

    fn index_price_source(&self, inst_id: &str) -> Result<Box<dyn PriceChunkSource>> {
        Ok(Box::new(FileChunkSource::new(self.inst_dir("indexprices", inst_id), price_rows_from_file)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_filename() {
        let path = Path::new("part-3-1687420840901-1687420999999.parquet");
        assert_eq!(parse_chunk_filename(path), Some((3, 1687420840901, 1687420999999)));
    }

    #[test]
    fn rejects_non_matching_filename() {
        assert_eq!(parse_chunk_filename(Path::new("snapshot.parquet")), None);
        assert_eq!(parse_chunk_filename(Path::new("part-a-b-c.parquet")), None);
    }

    #[test]
    fn missing_directory_is_reported_as_malformed() {
        let factory = ParquetDataSourceFactory::new("/nonexistent/path/for/sure");
        assert!(factory.book_source("BTC-USDT").is_err());
    }

    fn write_book_chunk(path: &Path, rows: &[(i64, &str, &str, f64, f64, u64)]) {
        use arrow::array::{Float64Array, Int64Array, StringArray, UInt64Array};
        use arrow::datatypes::{DataType, Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::arrow_writer::ArrowWriter;
        use std::sync::Arc;

        let schema = Arc::new(Schema::new(vec![
            Field::new("timestamp", DataType::Int64, false),
            Field::new("action", DataType::Utf8, false),
            Field::new("side", DataType::Utf8, false),
            Field::new("price", DataType::Float64, false),
            Field::new("size", DataType::Float64, false),
            Field::new("numOrders", DataType::UInt64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())),
                Arc::new(StringArray::from(rows.iter().map(|r| r.1).collect::<Vec<_>>())),
                Arc::new(StringArray::from(rows.iter().map(|r| r.2).collect::<Vec<_>>())),
                Arc::new(Float64Array::from(rows.iter().map(|r| r.3).collect::<Vec<_>>())),
                Arc::new(Float64Array::from(rows.iter().map(|r| r.4).collect::<Vec<_>>())),
                Arc::new(UInt64Array::from(rows.iter().map(|r| r.5).collect::<Vec<_>>())),
            ],
        )
        .expect("building the fixture record batch must succeed");

        let file = File::create(path).expect("creating the fixture parquet file must succeed");
        let mut writer = ArrowWriter::try_new(file, schema, None).expect("ArrowWriter::try_new");
        writer.write(&batch).expect("writing the fixture batch");
        writer.close().expect("closing the parquet writer");
    }

    #[test]
    fn reads_back_a_real_parquet_chunk_round_trip() {
        let dir = tempfile::tempdir().expect("creating a temp dir");
        let inst_dir = dir.path().join("books").join("BTC-USDT");
        std::fs::create_dir_all(&inst_dir).expect("creating the instrument directory");
        write_book_chunk(
            &inst_dir.join("part-0-0-1000.parquet"),
            &[
                (0, "snapshot", "ask", 101.0, 2.0, 1),
                (0, "snapshot", "bid", 99.0, 3.0, 1),
                (500, "update", "ask", 101.5, 1.0, 2),
            ],
        );

        let factory = ParquetDataSourceFactory::new(dir.path());
        let mut source = factory.book_source("BTC-USDT").expect("book_source over a real chunk file");
        let ranges = source.chunk_ranges().to_vec();
        assert_eq!(ranges, vec![(0, 1000)]);
        let rows = source.load_chunk(0).expect("load_chunk over a real parquet file");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].action, RowAction::Snapshot);
        assert_eq!(rows[0].side, BookSide::Ask);
        assert_eq!(rows[0].price, decimal_from_f64(101.0).unwrap());
        assert_eq!(rows[2].action, RowAction::Update);
        assert_eq!(rows[2].count, 2);
    }
}
