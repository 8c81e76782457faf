//! DataFusion execution engine
//!
//! Decoded records are registered as in-memory DataFrames; the extraction
//! rules are DataFrame plans (filter, select, distinct, join) executed by a
//! shared [`SessionContext`] and collected back into a single batch for the
//! table writer.

use crate::Result;

use arrow::compute::concat_batches;
use arrow_array::RecordBatch;
use arrow_schema::{Schema, SchemaRef};
use datafusion::prelude::{DataFrame, SessionConfig, SessionContext};
use std::sync::Arc;

const BATCH_SIZE: usize = 8192;

/// Shared DataFusion session. Clones share the same session state.
#[derive(Clone)]
pub struct Engine {
    ctx: SessionContext,
}

impl Engine {
    pub fn new() -> Self {
        let session_config = SessionConfig::new().with_batch_size(BATCH_SIZE);
        Self {
            ctx: SessionContext::new_with_config(session_config),
        }
    }

    /// Wrap an in-memory batch as a DataFrame
    pub fn read_batch(&self, batch: RecordBatch) -> Result<DataFrame> {
        Ok(self.ctx.read_batch(batch)?)
    }

    /// Execute `df` and concatenate its output.
    ///
    /// A plan producing no rows still yields a batch carrying the plan's
    /// schema.
    pub async fn collect(df: DataFrame) -> Result<RecordBatch> {
        let planned: SchemaRef = Arc::new(Schema::from(df.schema()));
        let batches = df.collect().await?;
        let schema = batches
            .first()
            .map(|batch| batch.schema())
            .unwrap_or(planned);
        Ok(concat_batches(&schema, &batches)?)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
