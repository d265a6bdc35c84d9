use anyhow::{Context, Result};
use duckdb::Connection;
use std::env;
use tracing::info;

/// The one fixed aggregation this job runs. One output row per (merchant,
/// transaction type, payment method, transaction date); only completed
/// transactions contribute. `load_at` captures the transform instant.
pub const AGGREGATE_SQL: &str = "\
SELECT
    merchant_id,
    transaction_type,
    transaction_payment_method,
    SUM(transaction_amount) AS transaction_amount,
    COUNT(DISTINCT transaction_id) AS \"transaction\",
    transaction_datetime::DATE AS transaction_date,
    current_timestamp AS load_at
FROM
    source
WHERE
    transaction_status = 'completed'
GROUP BY
    1, 2, 3, 6, 7";

/// One invocation's working memory: an in-memory DuckDB connection,
/// exclusively owned, discarded with the invocation.
pub struct EngineSession {
    conn: Connection,
}

impl EngineSession {
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening engine session")?;
        Ok(Self { conn })
    }

    /// Configure the session for gs:// reads and writes. Loads httpfs and,
    /// when an HMAC pair is present in the environment, registers it as the
    /// GCS secret. Only the service entry path calls this; local runs stay
    /// off the network.
    pub fn enable_remote_storage(&self) -> Result<()> {
        self.conn
            .execute_batch("INSTALL httpfs; LOAD httpfs;")
            .context("loading httpfs extension")?;

        if let (Ok(key_id), Ok(secret)) = (env::var("GCS_HMAC_KEY_ID"), env::var("GCS_HMAC_SECRET"))
        {
            let sql = format!(
                "CREATE OR REPLACE SECRET gcs_hmac (TYPE gcs, KEY_ID '{}', SECRET '{}');",
                sql_literal(&key_id),
                sql_literal(&secret),
            );
            self.conn
                .execute_batch(&sql)
                .context("registering gcs secret")?;
        }
        Ok(())
    }

    /// Materialize the partition at `source_uri` into the `source` table.
    /// The URI may be a glob; the table is the union of every matching file.
    /// No schema is asserted beyond whatever the files contain.
    pub fn extract(&self, source_uri: &str) -> Result<()> {
        let sql = format!(
            "CREATE TABLE source AS SELECT * FROM read_parquet('{}');",
            sql_literal(source_uri),
        );
        self.conn
            .execute_batch(&sql)
            .with_context(|| format!("reading parquet from {source_uri}"))?;
        let rows = self.count("source")?;
        info!(rows, "extracted source partition");
        Ok(())
    }

    /// Run the fixed aggregation into `transformed`, then drop `source` to
    /// free working memory.
    pub fn transform(&self) -> Result<()> {
        let sql = format!("CREATE TABLE transformed AS {AGGREGATE_SQL};");
        self.conn
            .execute_batch(&sql)
            .context("aggregating source partition")?;
        self.conn
            .execute_batch("DROP TABLE IF EXISTS source;")
            .context("dropping source table")?;
        let rows = self.count("transformed")?;
        info!(rows, "aggregated partition");
        Ok(())
    }

    /// Write `transformed` to `dest_uri` as a single zstd-compressed parquet
    /// file, then drop the table. Overwrite semantics are the storage
    /// layer's.
    pub fn stage_out(&self, dest_uri: &str) -> Result<()> {
        let sql = format!(
            "COPY (SELECT * FROM transformed) TO '{}' (FORMAT 'parquet', COMPRESSION 'zstd');",
            sql_literal(dest_uri),
        );
        self.conn
            .execute_batch(&sql)
            .with_context(|| format!("writing parquet to {dest_uri}"))?;
        self.conn
            .execute_batch("DROP TABLE IF EXISTS transformed;")
            .context("dropping transformed table")?;
        info!(uri = %dest_uri, "staged aggregate");
        Ok(())
    }

    fn count(&self, table: &str) -> Result<i64> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
                row.get(0)
            })?;
        Ok(n)
    }
}

/// Escape a value for embedding in a single-quoted SQL literal.
fn sql_literal(value: &str) -> String {
    value.replace('\'', "''")
}
