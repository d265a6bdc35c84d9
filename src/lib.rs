//! Daily merchant-transaction aggregation: parquet partition in from object
//! storage, one DuckDB aggregation, zstd parquet back out, BigQuery append
//! load.

pub mod engine;
pub mod partition;
pub mod pipeline;
pub mod trigger;
pub mod warehouse;

#[cfg(test)]
pub(crate) mod testutil;
