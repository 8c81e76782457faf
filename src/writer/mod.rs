//! Table writer
//!
//! Persists one logical table as Parquet under `<root>/<table>`:
//! - existing objects under the table prefix are deleted first (overwrite)
//! - rows are grouped by the table's partition columns into Hive-style
//!   directories (`year=2018/month=11/`), one file per partition
//! - partition columns also stay inside each file
//! - a `_SUCCESS` marker is written once every data file is in place
//!
//! The delete-then-write sequence is not atomic. If a write fails part way,
//! the table's previous contents are gone and the run must be repeated.

mod parquet_writer;

pub use parquet_writer::{ParquetWriter, DEFAULT_COMPRESSION_LEVEL};

use crate::schema::TableDefinition;
use crate::{Error, Result};

use arrow::compute::take_record_batch;
use arrow::util::display::array_value_to_string;
use arrow_array::{Array, RecordBatch, UInt32Array};
use futures::{StreamExt, TryStreamExt};
use object_store::path::Path;
use object_store::ObjectStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Name of the completion marker written after a table's data files
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Outcome of writing one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableWriteSummary {
    pub table: String,
    pub rows: usize,
    pub files: usize,
    /// Objects removed from a previous run
    pub replaced: usize,
}

/// Writes tables beneath a root prefix of an object store
#[derive(Debug, Clone)]
pub struct TableWriter {
    store: Arc<dyn ObjectStore>,
    root: Path,
    parquet: ParquetWriter,
    /// Distinguishes this run's files from any other writer's
    run_id: String,
}

impl TableWriter {
    pub fn new(store: Arc<dyn ObjectStore>, root: Path, parquet: ParquetWriter) -> Self {
        Self {
            store,
            root,
            parquet,
            run_id: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Location of a table's directory
    pub fn table_path(&self, table: &str) -> Path {
        self.root.child(table)
    }

    /// Replace the contents of `table` with `batch`.
    ///
    /// The batch's columns must be exactly the table's output columns, in
    /// order. Every partition column must be non-null on every row.
    pub async fn write(
        &self,
        table: &TableDefinition,
        batch: &RecordBatch,
    ) -> Result<TableWriteSummary> {
        check_columns(table, batch)?;
        let groups = partition_rows(table, batch)?;
        let table_path = self.table_path(table.name);

        let replaced = self.clear(table.name, &table_path).await?;

        let mut files = 0;
        for (index, (values, rows)) in groups.iter().enumerate() {
            let part = if table.is_partitioned() {
                take_record_batch(batch, &UInt32Array::from(rows.clone()))?
            } else {
                batch.clone()
            };

            let mut location = table_path.clone();
            for (column, value) in table.partition_by.iter().zip(values) {
                location = location.child(format!("{}={}", column, value));
            }
            let location = location.child(format!("part-{:05}-{}.parquet", index, self.run_id));

            self.put_batch(table.name, &location, part).await?;
            files += 1;
        }

        self.store
            .put(&table_path.child(SUCCESS_MARKER), Vec::<u8>::new().into())
            .await
            .map_err(|e| write_error(table.name, e))?;

        info!(
            table = table.name,
            rows = batch.num_rows(),
            files,
            replaced,
            location = %table_path,
            "Table written"
        );

        Ok(TableWriteSummary {
            table: table.name.to_string(),
            rows: batch.num_rows(),
            files,
            replaced,
        })
    }

    /// Delete everything under a table's prefix, returning the object count
    async fn clear(&self, table: &str, table_path: &Path) -> Result<usize> {
        let existing: Vec<Path> = self
            .store
            .list(Some(table_path))
            .map_ok(|meta| meta.location)
            .try_collect()
            .await
            .map_err(|e| write_error(table, e))?;

        // Listing is complete before the first delete
        let locations = futures::stream::iter(existing.into_iter().map(Ok)).boxed();
        let removed: Vec<Path> = self
            .store
            .delete_stream(locations)
            .try_collect()
            .await
            .map_err(|e| write_error(table, e))?;

        if !removed.is_empty() {
            debug!(table, removed = removed.len(), "Cleared previous table output");
        }
        Ok(removed.len())
    }

    async fn put_batch(&self, table: &str, location: &Path, batch: RecordBatch) -> Result<()> {
        let rows = batch.num_rows();
        let parquet = self.parquet.clone();
        // Encoding and compression are CPU-bound; keep them off the async workers
        let bytes = tokio::task::spawn_blocking(move || parquet.write_batch(&batch))
            .await
            .map_err(|e| Error::Internal(format!("parquet encode task failed: {}", e)))??;
        let size = bytes.len();
        self.store
            .put(location, bytes.into())
            .await
            .map_err(|e| write_error(table, e))?;
        debug!(table, location = %location, rows, size, "Wrote data file");
        Ok(())
    }
}

fn write_error(table: &str, e: object_store::Error) -> Error {
    Error::Write {
        table: table.to_string(),
        message: e.to_string(),
    }
}

fn check_columns(table: &TableDefinition, batch: &RecordBatch) -> Result<()> {
    let schema = batch.schema();
    let actual: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let expected: Vec<&str> = table.output_columns().collect();
    if actual != expected {
        return Err(Error::InvalidSchema(format!(
            "table {} expects columns {:?}, got {:?}",
            table.name, expected, actual
        )));
    }
    Ok(())
}

/// Group row indices by rendered partition values, ordered by those values.
///
/// Unpartitioned tables yield a single group holding every row, even when
/// the batch is empty, so their schema is always materialized. Partitioned
/// tables with no rows yield no groups.
fn partition_rows(
    table: &TableDefinition,
    batch: &RecordBatch,
) -> Result<BTreeMap<Vec<String>, Vec<u32>>> {
    let mut groups: BTreeMap<Vec<String>, Vec<u32>> = BTreeMap::new();

    if !table.is_partitioned() {
        groups.insert(Vec::new(), (0..batch.num_rows() as u32).collect());
        return Ok(groups);
    }

    let columns = table
        .partition_by
        .iter()
        .map(|name| {
            batch.column_by_name(name).ok_or_else(|| {
                Error::InvalidSchema(format!("table {} has no column {}", table.name, name))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for (column, name) in columns.iter().zip(table.partition_by) {
        if column.null_count() > 0 {
            let row = (0..column.len()).find(|i| column.is_null(*i)).unwrap_or(0);
            return Err(Error::NullPartitionValue {
                table: table.name.to_string(),
                column: name.to_string(),
                row,
            });
        }
    }

    for row in 0..batch.num_rows() {
        let key = columns
            .iter()
            .map(|column| array_value_to_string(column, row))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        groups.entry(key).or_default().push(row as u32);
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ARTISTS, SONGS, TIME};
    use arrow_array::{Float64Array, Int32Array, Int64Array, StringArray};
    use arrow_schema::{DataType, Field, Schema};
    use object_store::memory::InMemory;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn songs_batch(rows: &[(&str, Option<i64>, &str)]) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("song_id", DataType::Utf8, true),
            Field::new("title", DataType::Utf8, true),
            Field::new("artist_id", DataType::Utf8, true),
            Field::new("year", DataType::Int64, true),
            Field::new("duration", DataType::Float64, true),
        ]));
        let ids = StringArray::from(rows.iter().map(|r| r.0).collect::<Vec<_>>());
        let titles = StringArray::from(rows.iter().map(|r| r.0).collect::<Vec<_>>());
        let artists = StringArray::from(rows.iter().map(|r| r.2).collect::<Vec<_>>());
        let years: Int64Array = rows.iter().map(|r| r.1).collect();
        let durations = Float64Array::from(vec![200.0; rows.len()]);
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ids),
                Arc::new(titles),
                Arc::new(artists),
                Arc::new(years),
                Arc::new(durations),
            ],
        )
        .unwrap()
    }

    fn artists_batch(ids: &[&str]) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("artist_id", DataType::Utf8, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("location", DataType::Utf8, true),
            Field::new("latitude", DataType::Float64, true),
            Field::new("longitude", DataType::Float64, true),
        ]));
        let n = ids.len();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids.to_vec())),
                Arc::new(StringArray::from(vec!["name"; n])),
                Arc::new(StringArray::from(vec![None::<&str>; n])),
                Arc::new(Float64Array::from(vec![None::<f64>; n])),
                Arc::new(Float64Array::from(vec![None::<f64>; n])),
            ],
        )
        .unwrap()
    }

    async fn list(store: &InMemory, prefix: &str) -> Vec<String> {
        let mut paths: Vec<String> = store
            .list(Some(&Path::from(prefix)))
            .map_ok(|m| m.location.to_string())
            .try_collect()
            .await
            .unwrap();
        paths.sort();
        paths
    }

    fn writer(store: Arc<InMemory>) -> TableWriter {
        TableWriter::new(store, Path::from("out"), ParquetWriter::default())
    }

    #[tokio::test]
    async fn test_partitioned_layout() {
        let store = Arc::new(InMemory::new());
        let batch = songs_batch(&[
            ("S1", Some(2000), "AR1"),
            ("S2", Some(2000), "AR1"),
            ("S3", Some(1999), "AR2"),
        ]);

        let summary = writer(store.clone()).write(&SONGS, &batch).await.unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.replaced, 0);

        let paths = list(&store, "out/songs").await;
        assert_eq!(paths.len(), 3);
        assert!(paths[0].starts_with("out/songs/_SUCCESS"));
        assert!(paths[1].starts_with("out/songs/year=1999/artist_id=AR2/part-"));
        assert!(paths[2].starts_with("out/songs/year=2000/artist_id=AR1/part-"));
    }

    #[tokio::test]
    async fn test_partition_files_keep_partition_columns() {
        let store = Arc::new(InMemory::new());
        let batch = songs_batch(&[("S1", Some(2000), "AR1"), ("S2", Some(2000), "AR1")]);
        writer(store.clone()).write(&SONGS, &batch).await.unwrap();

        let paths = list(&store, "out/songs/year=2000").await;
        let bytes = store
            .get(&Path::from(paths[0].as_str()))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.into_iter().next().unwrap().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert!(batch.column_by_name("year").is_some());
        assert!(batch.column_by_name("artist_id").is_some());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_previous_output() {
        let store = Arc::new(InMemory::new());
        store
            .put(&Path::from("out/artists/stale.parquet"), vec![1u8, 2, 3].into())
            .await
            .unwrap();
        store
            .put(&Path::from("out/artists_backup/keep.parquet"), vec![1u8].into())
            .await
            .unwrap();

        let first = writer(store.clone())
            .write(&ARTISTS, &artists_batch(&["AR1", "AR2"]))
            .await
            .unwrap();
        assert_eq!(first.replaced, 1);

        let second = writer(store.clone())
            .write(&ARTISTS, &artists_batch(&["AR3"]))
            .await
            .unwrap();
        assert_eq!(second.replaced, 2);

        let paths = list(&store, "out/artists").await;
        assert_eq!(paths.len(), 2);
        assert!(!paths.iter().any(|p| p.contains("stale")));
        assert_eq!(list(&store, "out/artists_backup").await.len(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_removes_every_partition_file() {
        let store = Arc::new(InMemory::new());
        let first = songs_batch(&[
            ("S1", Some(2000), "AR1"),
            ("S2", Some(1999), "AR2"),
            ("S3", Some(1998), "AR3"),
        ]);
        writer(store.clone()).write(&SONGS, &first).await.unwrap();
        assert_eq!(list(&store, "out/songs").await.len(), 4);

        let second = songs_batch(&[("S4", Some(2010), "AR4")]);
        let summary = writer(store.clone()).write(&SONGS, &second).await.unwrap();
        // three data files plus the marker
        assert_eq!(summary.replaced, 4);

        let paths = list(&store, "out/songs").await;
        assert_eq!(paths.len(), 2);
        assert!(paths[1].starts_with("out/songs/year=2010/artist_id=AR4/part-"));
        assert!(list(&store, "out/songs/year=2000").await.is_empty());
    }

    #[tokio::test]
    async fn test_null_partition_value_fails_before_clearing() {
        let store = Arc::new(InMemory::new());
        store
            .put(&Path::from("out/songs/previous.parquet"), vec![1u8].into())
            .await
            .unwrap();

        let batch = songs_batch(&[("S1", Some(2000), "AR1"), ("S2", None, "AR1")]);
        let err = writer(store.clone()).write(&SONGS, &batch).await.unwrap_err();
        match err {
            Error::NullPartitionValue { table, column, row } => {
                assert_eq!(table, "songs");
                assert_eq!(column, "year");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(list(&store, "out/songs").await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_tables() {
        let store = Arc::new(InMemory::new());
        let w = writer(store.clone());

        let songs = w.write(&SONGS, &songs_batch(&[])).await.unwrap();
        assert_eq!(songs.files, 0);
        assert_eq!(list(&store, "out/songs").await, vec!["out/songs/_SUCCESS"]);

        let artists = w.write(&ARTISTS, &artists_batch(&[])).await.unwrap();
        assert_eq!(artists.files, 1);
        assert_eq!(list(&store, "out/artists").await.len(), 2);
    }

    #[tokio::test]
    async fn test_rejects_batch_with_wrong_columns() {
        let store = Arc::new(InMemory::new());
        let batch = artists_batch(&["AR1"]);
        let err = writer(store).write(&SONGS, &batch).await.unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[tokio::test]
    async fn test_partition_values_are_path_safe() {
        let store = Arc::new(InMemory::new());
        let batch = songs_batch(&[("S1", Some(2000), "AR/1")]);
        writer(store.clone()).write(&SONGS, &batch).await.unwrap();

        let paths = list(&store, "out/songs/year=2000").await;
        assert_eq!(paths.len(), 1);
        assert!(!paths[0].contains("AR/1"));
    }

    #[test]
    fn test_time_partitions_group_by_year_and_month() {
        let schema = Arc::new(Schema::new(
            TIME.output_columns()
                .map(|name| {
                    let data_type = if name == "start_time" {
                        DataType::Int64
                    } else {
                        DataType::Int32
                    };
                    Field::new(name, data_type, false)
                })
                .collect::<Vec<_>>(),
        ));
        let ints = |v: Vec<i32>| Arc::new(Int32Array::from(v)) as arrow_array::ArrayRef;
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])) as arrow_array::ArrayRef,
                ints(vec![0, 0, 0]),
                ints(vec![1, 1, 1]),
                ints(vec![1, 1, 1]),
                ints(vec![11, 12, 11]),
                ints(vec![2018, 2018, 2018]),
                ints(vec![1, 1, 1]),
            ],
        )
        .unwrap();

        let groups = partition_rows(&TIME, &batch).unwrap();
        let keys: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                vec!["2018".to_string(), "11".to_string()],
                vec!["2018".to_string(), "12".to_string()]
            ]
        );
        assert_eq!(groups[&keys[0]], vec![0, 2]);
    }
}
