//! Run orchestration
//!
//! A run loads both record sources, derives the five tables and overwrites
//! them under the output root. The catalog and usage extractors run as
//! separate tasks sharing one query engine; the first error aborts the run.

use crate::config::ComponentFactory;
use crate::engine::Engine;
use crate::extract::{CatalogExtractor, UsageExtractor};
use crate::schema::{catalog_schema, usage_schema};
use crate::source::{RecordSource, DEFAULT_READ_CONCURRENCY};
use crate::writer::{ParquetWriter, TableWriteSummary, TableWriter, DEFAULT_COMPRESSION_LEVEL};
use crate::{Config, Error, Result};

use chrono::{FixedOffset, Offset, Utc};
use object_store::path::Path;
use object_store::ObjectStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Result of a completed run, printed by the binary
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub elapsed_ms: u64,
    pub tables: Vec<TableWriteSummary>,
}

impl RunSummary {
    pub fn table(&self, name: &str) -> Option<&TableWriteSummary> {
        self.tables.iter().find(|t| t.table == name)
    }
}

/// Tuning knobs shared by both extractors
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub timezone: FixedOffset,
    pub read_concurrency: usize,
    pub compression_level: i32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            timezone: Utc.fix(),
            read_concurrency: DEFAULT_READ_CONCURRENCY,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            timezone: config.timezone,
            read_concurrency: config.read_concurrency,
            compression_level: config.compression_level,
        }
    }
}

/// The ETL job
pub struct Pipeline {
    catalog: CatalogExtractor,
    usage: UsageExtractor,
    run_id: String,
}

impl Pipeline {
    /// Build from resolved configuration, opening every location
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_factory(config, &ComponentFactory::new(config.storage.clone()))
    }

    /// Build from resolved configuration using an existing factory
    pub fn from_factory(config: &Config, factory: &ComponentFactory) -> Result<Self> {
        let catalog = factory.open_input(&config.catalog_location)?;
        let usage = factory.open_input(&config.usage_location)?;
        let output = factory.open_output(&config.output_location)?;
        Self::new(catalog, usage, output, PipelineOptions::from(config))
    }

    /// Build from already opened `(store, prefix)` locations
    pub fn new(
        catalog: (Arc<dyn ObjectStore>, Path),
        usage: (Arc<dyn ObjectStore>, Path),
        output: (Arc<dyn ObjectStore>, Path),
        options: PipelineOptions,
    ) -> Result<Self> {
        let catalog_source = RecordSource::new(catalog.0, catalog.1, catalog_schema())
            .with_read_concurrency(options.read_concurrency);
        let usage_source = RecordSource::new(usage.0, usage.1, usage_schema())
            .with_read_concurrency(options.read_concurrency);

        let parquet = ParquetWriter::new(options.compression_level)?;
        let writer = Arc::new(TableWriter::new(output.0, output.1, parquet));
        let run_id = writer.run_id().to_string();
        let engine = Engine::new();

        Ok(Self {
            catalog: CatalogExtractor::new(catalog_source.clone(), engine.clone(), writer.clone()),
            usage: UsageExtractor::new(
                usage_source,
                catalog_source,
                engine,
                writer,
                options.timezone,
            ),
            run_id,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        info!(run_id = %self.run_id, "Starting run");

        let catalog = self.catalog.clone();
        let usage = self.usage.clone();
        let catalog = tokio::spawn(async move { catalog.run().await });
        let usage = tokio::spawn(async move { usage.run().await });

        let (catalog, usage) = tokio::try_join!(flatten(catalog), flatten(usage))?;
        let tables: Vec<TableWriteSummary> = catalog.into_iter().chain(usage).collect();

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            run_id = %self.run_id,
            tables = tables.len(),
            elapsed_ms,
            "Run complete"
        );

        Ok(RunSummary {
            run_id: self.run_id.clone(),
            elapsed_ms,
            tables,
        })
    }
}

async fn flatten<T>(handle: tokio::task::JoinHandle<Result<T>>) -> Result<T> {
    handle
        .await
        .map_err(|e| Error::Internal(format!("extractor task failed: {}", e)))?
}
