use anyhow::{Context, Result};
use serde::Deserialize;

/// The single structured input of an invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRequest {
    /// Object-storage bucket holding both the raw and processed partitions.
    pub bucket: String,
    /// Fully-qualified destination table, `project.dataset.table`.
    pub table_id: String,
}

impl TriggerRequest {
    /// Field lookup happens here, before any I/O; a missing key fails the
    /// invocation on the spot.
    pub fn from_value(body: serde_json::Value) -> Result<Self> {
        serde_json::from_value(body).context("reading trigger request")
    }
}
