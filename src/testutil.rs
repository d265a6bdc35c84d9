use anyhow::Result;
use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use duckdb::Connection;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// One raw merchant transaction, shaped the way the upstream producer writes
/// the partition.
pub struct SourceRow {
    pub merchant_id: &'static str,
    pub transaction_id: &'static str,
    pub transaction_type: &'static str,
    pub payment_method: &'static str,
    pub amount: f64,
    pub status: &'static str,
    /// `YYYY-MM-DD HH:MM:SS`, written as a microsecond timestamp column.
    pub datetime: &'static str,
}

fn timestamp_micros(datetime: &str) -> i64 {
    NaiveDateTime::parse_from_str(datetime, "%Y-%m-%d %H:%M:%S")
        .expect("fixture datetime")
        .and_utc()
        .timestamp_micros()
}

/// Write `rows` as a parquet file at `path`.
pub fn write_source_parquet(path: &Path, rows: &[SourceRow]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("merchant_id", DataType::Utf8, false),
        Field::new("transaction_id", DataType::Utf8, false),
        Field::new("transaction_type", DataType::Utf8, false),
        Field::new("transaction_payment_method", DataType::Utf8, false),
        Field::new("transaction_amount", DataType::Float64, false),
        Field::new("transaction_status", DataType::Utf8, false),
        Field::new(
            "transaction_datetime",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.merchant_id),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.transaction_id),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.transaction_type),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.payment_method),
        )),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|r| r.amount),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.status),
        )),
        Arc::new(TimestampMicrosecondArray::from_iter_values(
            rows.iter().map(|r| timestamp_micros(r.datetime)),
        )),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(File::create(path)?, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

pub type AggregateRow = (String, String, String, f64, i64, String);

/// Read the grouped columns of a staged aggregate file, ordered by group key.
/// `load_at` is deliberately left out: it differs per run.
pub fn read_aggregate_rows(path: &Path) -> Result<Vec<AggregateRow>> {
    let conn = Connection::open_in_memory()?;
    let sql = format!(
        "SELECT merchant_id, transaction_type, transaction_payment_method, \
         transaction_amount, \"transaction\", CAST(transaction_date AS VARCHAR) \
         FROM read_parquet('{}') ORDER BY 1, 2, 3, 6",
        path.display(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;
    Ok(rows)
}
