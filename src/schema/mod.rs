//! Schema definitions for songlake
//!
//! Input records are decoded against explicit Arrow schemas rather than
//! inferred ones, so a type mismatch in a source file surfaces as a malformed
//! record instead of silently changing the output schema. Output tables are
//! described declaratively as projections of those inputs.

mod records;
mod tables;

pub use records::{
    catalog_schema, usage_schema, ARTIST_ID_FIELD, ARTIST_LATITUDE_FIELD, ARTIST_LOCATION_FIELD,
    ARTIST_LONGITUDE_FIELD, ARTIST_NAME_FIELD, DURATION_FIELD, NEXT_SONG_PAGE, SONG_ID_FIELD,
    TITLE_FIELD, USAGE_ARTIST_FIELD, USAGE_FIRST_NAME_FIELD, USAGE_GENDER_FIELD,
    USAGE_LAST_NAME_FIELD, USAGE_LEVEL_FIELD, USAGE_LOCATION_FIELD, USAGE_PAGE_FIELD,
    USAGE_SESSION_ID_FIELD, USAGE_SONG_FIELD, USAGE_TS_FIELD, USAGE_USER_AGENT_FIELD,
    USAGE_USER_ID_FIELD, YEAR_FIELD,
};
pub use tables::{
    ColumnMapping, TableDefinition, ALL_TABLES, ARTISTS, DAY_COLUMN, HOUR_COLUMN, MONTH_COLUMN,
    SONGPLAYS, SONGS, START_TIME_COLUMN, TIME, USERS, WEEKDAY_COLUMN, WEEK_COLUMN, YEAR_COLUMN,
};
