//! Usage extractor: `users`, `time` and `songplays`

use super::calendar::with_calendar_columns;
use crate::engine::Engine;
use crate::schema::{
    ARTIST_ID_FIELD, ARTIST_NAME_FIELD, NEXT_SONG_PAGE, SONGPLAYS, SONG_ID_FIELD, TIME,
    TITLE_FIELD, USAGE_ARTIST_FIELD, USAGE_PAGE_FIELD, USAGE_SONG_FIELD, USAGE_TS_FIELD, USERS,
};
use crate::source::RecordSource;
use crate::writer::{TableWriteSummary, TableWriter};
use crate::Result;

use chrono::FixedOffset;
use datafusion::logical_expr::{ident, lit, JoinType};
use datafusion::prelude::DataFrame;
use std::sync::Arc;
use tracing::info;

/// Keep only playback events (`page == "NextSong"`, exact match)
pub fn playback_events(events: DataFrame) -> Result<DataFrame> {
    Ok(events.filter(ident(USAGE_PAGE_FIELD).eq(lit(NEXT_SONG_PAGE)))?)
}

/// `users`: one row per distinct (user_id, first_name, last_name, gender,
/// level). A user seen at two subscription levels keeps both rows.
pub fn users_table(plays: DataFrame) -> Result<DataFrame> {
    Ok(plays.select(USERS.select_exprs())?.distinct()?)
}

/// `time`: one row per distinct `start_time` of a calendar-enriched play set
pub fn time_table(timed_plays: DataFrame) -> Result<DataFrame> {
    Ok(timed_plays.select(TIME.select_exprs())?.distinct()?)
}

/// `songplays`: calendar-enriched plays inner-joined to the catalog on
/// (artist name, song title).
///
/// Matching is exact and case-sensitive. A play matching several catalog
/// rows yields one fact row per match; a play matching none is dropped.
pub fn songplays_table(timed_plays: DataFrame, catalog: DataFrame) -> Result<DataFrame> {
    let catalog_keys = catalog.select(vec![
        ident(ARTIST_NAME_FIELD),
        ident(TITLE_FIELD),
        ident(SONG_ID_FIELD),
        ident(ARTIST_ID_FIELD),
    ])?;

    Ok(timed_plays
        .join(
            catalog_keys,
            JoinType::Inner,
            &[USAGE_ARTIST_FIELD, USAGE_SONG_FIELD],
            &[ARTIST_NAME_FIELD, TITLE_FIELD],
            None,
        )?
        .select(SONGPLAYS.select_exprs())?)
}

/// Builds the usage dimension tables and the fact table
#[derive(Clone)]
pub struct UsageExtractor {
    source: RecordSource,
    catalog: RecordSource,
    engine: Engine,
    writer: Arc<TableWriter>,
    offset: FixedOffset,
}

impl UsageExtractor {
    /// `offset` pins the time zone used for calendar decomposition
    pub fn new(
        source: RecordSource,
        catalog: RecordSource,
        engine: Engine,
        writer: Arc<TableWriter>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            source,
            catalog,
            engine,
            writer,
            offset,
        }
    }

    pub async fn run(&self) -> Result<Vec<TableWriteSummary>> {
        let (events, catalog) = tokio::try_join!(self.source.load(), self.catalog.load())?;
        let event_count = events.num_rows();

        let plays = Engine::collect(playback_events(self.engine.read_batch(events)?)?).await?;
        let play_count = plays.num_rows();
        let timed = with_calendar_columns(&plays, USAGE_TS_FIELD, &self.offset)?;

        let plays = self.engine.read_batch(plays)?;
        let timed = self.engine.read_batch(timed)?;
        let catalog = self.engine.read_batch(catalog)?;

        let (users, time, songplays) = tokio::try_join!(
            Engine::collect(users_table(plays)?),
            Engine::collect(time_table(timed.clone())?),
            Engine::collect(songplays_table(timed, catalog)?)
        )?;
        info!(
            events = event_count,
            plays = play_count,
            users = users.num_rows(),
            time = time.num_rows(),
            songplays = songplays.num_rows(),
            "Derived usage tables"
        );

        let (users, time, songplays) = tokio::try_join!(
            self.writer.write(&USERS, &users),
            self.writer.write(&TIME, &time),
            self.writer.write(&SONGPLAYS, &songplays)
        )?;
        Ok(vec![users, time, songplays])
    }
}
