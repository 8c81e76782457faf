//! Catalog extractor: `songs` and `artists`

use crate::engine::Engine;
use crate::schema::{ARTISTS, SONGS};
use crate::source::RecordSource;
use crate::writer::{TableWriteSummary, TableWriter};
use crate::Result;

use datafusion::prelude::DataFrame;
use std::sync::Arc;
use tracing::info;

/// `songs`: one row per distinct (song_id, title, artist_id, year, duration)
pub fn songs_table(records: DataFrame) -> Result<DataFrame> {
    Ok(records.select(SONGS.select_exprs())?.distinct()?)
}

/// `artists`: one row per distinct (artist_id, name, location, latitude, longitude)
pub fn artists_table(records: DataFrame) -> Result<DataFrame> {
    Ok(records.select(ARTISTS.select_exprs())?.distinct()?)
}

/// Builds the catalog dimension tables. Every record participates; there is
/// no filtering step.
#[derive(Clone)]
pub struct CatalogExtractor {
    source: RecordSource,
    engine: Engine,
    writer: Arc<TableWriter>,
}

impl CatalogExtractor {
    pub fn new(source: RecordSource, engine: Engine, writer: Arc<TableWriter>) -> Self {
        Self {
            source,
            engine,
            writer,
        }
    }

    pub async fn run(&self) -> Result<Vec<TableWriteSummary>> {
        let records = self.source.load().await?;
        let record_count = records.num_rows();
        let records = self.engine.read_batch(records)?;

        let (songs, artists) = tokio::try_join!(
            Engine::collect(songs_table(records.clone())?),
            Engine::collect(artists_table(records)?)
        )?;
        info!(
            records = record_count,
            songs = songs.num_rows(),
            artists = artists.num_rows(),
            "Derived catalog tables"
        );

        let (songs, artists) = tokio::try_join!(
            self.writer.write(&SONGS, &songs),
            self.writer.write(&ARTISTS, &artists)
        )?;
        Ok(vec![songs, artists])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog_schema;
    use crate::source::decode_records;
    use arrow_array::cast::AsArray;
    use arrow_array::RecordBatch;

    fn catalog(engine: &Engine, lines: &[&str]) -> DataFrame {
        let batch = decode_records(catalog_schema(), lines.join("\n").as_bytes()).unwrap();
        engine.read_batch(batch).unwrap()
    }

    async fn run(df: Result<DataFrame>) -> RecordBatch {
        Engine::collect(df.unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_song_records_collapse() {
        let engine = Engine::new();
        let record = r#"{"song_id": "S1", "title": "Intro", "artist_id": "AR1", "artist_name": "Band", "year": 2001, "duration": 120.5}"#;

        let songs = run(songs_table(catalog(&engine, &[record, record]))).await;
        assert_eq!(songs.num_rows(), 1);
        let ids = songs.column_by_name("song_id").unwrap().as_string::<i32>();
        assert_eq!(ids.value(0), "S1");
    }

    #[tokio::test]
    async fn test_same_song_id_with_different_values_is_kept() {
        let engine = Engine::new();
        let records = catalog(
            &engine,
            &[
                r#"{"song_id": "S1", "title": "Intro", "artist_id": "AR1", "year": 2001, "duration": 120.5}"#,
                r#"{"song_id": "S1", "title": "Intro (Live)", "artist_id": "AR1", "year": 2001, "duration": 130.0}"#,
            ],
        );
        assert_eq!(run(songs_table(records)).await.num_rows(), 2);
    }

    #[tokio::test]
    async fn test_artists_one_row_per_distinct_artist() {
        let engine = Engine::new();
        let records = catalog(
            &engine,
            &[
                r#"{"song_id": "S1", "artist_id": "AR1", "artist_name": "Band", "artist_location": "Oslo", "artist_latitude": 59.9, "artist_longitude": 10.7}"#,
                r#"{"song_id": "S2", "artist_id": "AR1", "artist_name": "Band", "artist_location": "Oslo", "artist_latitude": 59.9, "artist_longitude": 10.7}"#,
                r#"{"song_id": "S3", "artist_id": "AR2", "artist_name": "Other", "artist_location": null}"#,
            ],
        );

        let artists = run(artists_table(records)).await;
        assert_eq!(artists.num_rows(), 2);
        let columns: Vec<String> = artists
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(
            columns,
            vec!["artist_id", "name", "location", "latitude", "longitude"]
        );
    }

    #[tokio::test]
    async fn test_catalog_dedup_is_idempotent() {
        let engine = Engine::new();
        let records = catalog(
            &engine,
            &[
                r#"{"song_id": "S1", "artist_id": "AR1", "year": 1}"#,
                r#"{"song_id": "S1", "artist_id": "AR1", "year": 1}"#,
                r#"{"song_id": "S2", "artist_id": "AR1", "year": 1}"#,
            ],
        );
        let songs = run(songs_table(records)).await;
        assert_eq!(songs.num_rows(), 2);

        let again = engine.read_batch(songs).unwrap().distinct().unwrap();
        let again = Engine::collect(again).await.unwrap();
        assert_eq!(again.num_rows(), 2);
    }
}
