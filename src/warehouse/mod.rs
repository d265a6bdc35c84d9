use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use google_cloud_bigquery::client::{Client, ClientConfig};
use google_cloud_bigquery::http::job::query::QueryRequest;
use google_cloud_bigquery::query::row::Row;
use tracing::info;

/// Destination side of the pipeline. The pipeline only ever sees this trait;
/// production wires in BigQuery, tests substitute a recorder.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Append the parquet file at `source_uri` into `table_id`, blocking
    /// until the load job reaches a terminal state. Not idempotent: loading
    /// the same file twice appends its rows twice.
    async fn load_parquet(&self, source_uri: &str, table_id: &str) -> Result<()>;
}

/// Append loads through BigQuery's batch load surface. Credentials come from
/// the ambient application-default chain, resolved per call; the client lives
/// no longer than the invocation, like the engine session.
pub struct BigQueryWarehouse;

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn load_parquet(&self, source_uri: &str, table_id: &str) -> Result<()> {
        let (config, project_id) = ClientConfig::new_with_auth()
            .await
            .context("authenticating BigQuery client")?;
        let project_id =
            project_id.ok_or_else(|| anyhow!("no project id in application default credentials"))?;
        let client = Client::new(config).await?;

        let statement = format!(
            "LOAD DATA INTO `{table_id}` FROM FILES (format = 'PARQUET', uris = ['{source_uri}'])"
        );
        info!(table_id = %table_id, uri = %source_uri, "submitting warehouse load job");

        let request = QueryRequest {
            query: statement,
            use_legacy_sql: false,
            ..Default::default()
        };
        let mut rows = client
            .query::<Row>(&project_id, request)
            .await
            .context("warehouse load job failed")?;
        while let Some(_) = rows.next().await? {
            // LOAD DATA produces no rows; drain to completion regardless.
        }

        info!(table_id = %table_id, "warehouse load complete");
        Ok(())
    }
}

/// Records every load request instead of performing it.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingWarehouse {
    pub loads: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
#[async_trait]
impl Warehouse for RecordingWarehouse {
    async fn load_parquet(&self, source_uri: &str, table_id: &str) -> Result<()> {
        self.loads
            .lock()
            .unwrap()
            .push((source_uri.to_string(), table_id.to_string()));
        Ok(())
    }
}
