use crate::engine::EngineSession;
use crate::partition::{self, Partition};
use crate::trigger::TriggerRequest;
use crate::warehouse::Warehouse;
use anyhow::{Context, Result};
use tracing::{error, info};

/// Full invocation: parse the trigger, resolve yesterday's partition, run the
/// pipeline against it. Every failure collapses into the single terminal
/// result string; the error itself only reaches the log.
pub async fn handle(body: serde_json::Value, warehouse: &dyn Warehouse) -> &'static str {
    match run_trigger(body, warehouse).await {
        Ok(()) => {
            info!("pipeline complete");
            "Completed."
        }
        Err(err) => {
            error!("pipeline failed: {err:#}");
            "Failed."
        }
    }
}

async fn run_trigger(body: serde_json::Value, warehouse: &dyn Warehouse) -> Result<()> {
    let request = TriggerRequest::from_value(body)?;
    let partition = Partition::new(&request.bucket, partition::previous_day());
    info!(
        input = %partition.input_uri(),
        output = %partition.output_uri(),
        table_id = %request.table_id,
        "resolved partition"
    );

    let session = EngineSession::open_in_memory()?;
    session.enable_remote_storage()?;
    run(
        session,
        partition.input_uri(),
        partition.output_uri(),
        &request.table_id,
        warehouse,
    )
    .await
}

/// Extract → transform → stage out → warehouse load, strictly in order. The
/// engine steps are synchronous DuckDB work and run on the blocking pool.
/// The session is consumed; whatever it still holds on failure dies with it.
pub async fn run(
    session: EngineSession,
    input_uri: String,
    output_uri: String,
    table_id: &str,
    warehouse: &dyn Warehouse,
) -> Result<()> {
    let staged = output_uri.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        session.extract(&input_uri)?;
        session.transform()?;
        session.stage_out(&staged)
    })
    .await
    .context("engine task aborted")??;

    warehouse.load_parquet(&output_uri, table_id).await
}
