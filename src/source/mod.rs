//! Record sources
//!
//! A source is a root prefix inside an object store holding JSON record files
//! in an arbitrarily nested layout. Discovery lists the prefix recursively and
//! keeps files with the configured extension; loading decodes every file
//! against the source's declared schema and unions the results.

use crate::{Error, Result};

use arrow::compute::concat_batches;
use arrow::json::ReaderBuilder;
use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use futures::{StreamExt, TryStreamExt};
use object_store::path::Path;
use object_store::ObjectStore;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of files fetched concurrently
pub const DEFAULT_READ_CONCURRENCY: usize = 16;

const DECODE_BATCH_SIZE: usize = 8192;

/// A set of JSON record files under one prefix
#[derive(Debug, Clone)]
pub struct RecordSource {
    store: Arc<dyn ObjectStore>,
    prefix: Path,
    extension: String,
    schema: SchemaRef,
    read_concurrency: usize,
}

impl RecordSource {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Path, schema: SchemaRef) -> Self {
        Self {
            store,
            prefix,
            extension: "json".to_string(),
            schema,
            read_concurrency: DEFAULT_READ_CONCURRENCY,
        }
    }

    /// Match files ending in `.<extension>` instead of `.json`
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_read_concurrency(mut self, read_concurrency: usize) -> Self {
        self.read_concurrency = read_concurrency.max(1);
        self
    }

    /// List every matching file below the prefix, sorted by path.
    ///
    /// Files whose name starts with `.` or `_` (editor swap files, job
    /// markers) are skipped.
    pub async fn discover(&self) -> Result<Vec<Path>> {
        let listed: Vec<_> = self
            .store
            .list(Some(&self.prefix))
            .try_collect()
            .await
            .map_err(|e| Error::InputAccess {
                location: self.prefix.to_string(),
                message: e.to_string(),
            })?;

        let suffix = format!(".{}", self.extension);
        let mut files: Vec<Path> = listed
            .into_iter()
            .map(|meta| meta.location)
            .filter(|location| match location.filename() {
                Some(name) => {
                    name.ends_with(&suffix) && !name.starts_with('.') && !name.starts_with('_')
                }
                None => false,
            })
            .collect();
        files.sort_by_cached_key(|p| p.to_string());

        if files.is_empty() {
            return Err(Error::NoInputFiles {
                location: self.prefix.to_string(),
                extension: self.extension.clone(),
            });
        }

        debug!(prefix = %self.prefix, files = files.len(), "Discovered record files");
        Ok(files)
    }

    /// Read and decode every discovered file into one batch
    pub async fn load(&self) -> Result<RecordBatch> {
        let files = self.discover().await?;
        let file_count = files.len();

        let batches: Vec<RecordBatch> = futures::stream::iter(files)
            .map(|path| async move { self.read_file(&path).await })
            .buffered(self.read_concurrency)
            .try_collect()
            .await?;

        let batch = concat_batches(&self.schema, &batches)?;
        info!(
            prefix = %self.prefix,
            files = file_count,
            rows = batch.num_rows(),
            "Loaded records"
        );
        Ok(batch)
    }

    async fn read_file(&self, path: &Path) -> Result<RecordBatch> {
        let data = self
            .store
            .get(path)
            .await
            .map_err(|e| Error::InputAccess {
                location: path.to_string(),
                message: e.to_string(),
            })?
            .bytes()
            .await
            .map_err(|e| Error::InputAccess {
                location: path.to_string(),
                message: e.to_string(),
            })?;

        // Decoding is CPU-bound; keep it off the async workers
        let schema = self.schema.clone();
        tokio::task::spawn_blocking(move || decode_records(schema, &data))
            .await
            .map_err(|e| Error::Internal(format!("decode task for {} failed: {}", path, e)))?
            .map_err(|e| Error::MalformedRecord {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

/// Decode whitespace-separated JSON objects against `schema`.
///
/// Keys not present in the schema are ignored; numbers read into string
/// columns keep their textual form. Any other type mismatch is an error.
pub fn decode_records(schema: SchemaRef, data: &[u8]) -> Result<RecordBatch> {
    let reader = ReaderBuilder::new(schema.clone())
        .with_batch_size(DECODE_BATCH_SIZE)
        .with_coerce_primitive(true)
        .build(Cursor::new(data))?;

    let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}
