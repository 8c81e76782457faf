//! Input record schemas
//!
//! Field names match the JSON keys of the source files. Every field is
//! nullable: absent keys decode to null and are only rejected where a
//! downstream rule requires a value (timestamps, partition columns).

use arrow_schema::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

/// Catalog (song) record fields
pub const SONG_ID_FIELD: &str = "song_id";
pub const TITLE_FIELD: &str = "title";
pub const ARTIST_ID_FIELD: &str = "artist_id";
pub const ARTIST_NAME_FIELD: &str = "artist_name";
pub const ARTIST_LOCATION_FIELD: &str = "artist_location";
pub const ARTIST_LATITUDE_FIELD: &str = "artist_latitude";
pub const ARTIST_LONGITUDE_FIELD: &str = "artist_longitude";
pub const YEAR_FIELD: &str = "year";
pub const DURATION_FIELD: &str = "duration";
const NUM_SONGS_FIELD: &str = "num_songs";

/// Usage (log) record fields
pub const USAGE_PAGE_FIELD: &str = "page";
pub const USAGE_USER_ID_FIELD: &str = "userId";
pub const USAGE_FIRST_NAME_FIELD: &str = "firstName";
pub const USAGE_LAST_NAME_FIELD: &str = "lastName";
pub const USAGE_GENDER_FIELD: &str = "gender";
pub const USAGE_LEVEL_FIELD: &str = "level";
pub const USAGE_TS_FIELD: &str = "ts";
pub const USAGE_ARTIST_FIELD: &str = "artist";
pub const USAGE_SONG_FIELD: &str = "song";
pub const USAGE_SESSION_ID_FIELD: &str = "sessionId";
pub const USAGE_LOCATION_FIELD: &str = "location";
pub const USAGE_USER_AGENT_FIELD: &str = "userAgent";

/// Page value marking an actual playback event
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// Schema of one catalog record
pub fn catalog_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(NUM_SONGS_FIELD, DataType::Int64, true),
        Field::new(ARTIST_ID_FIELD, DataType::Utf8, true),
        Field::new(ARTIST_LATITUDE_FIELD, DataType::Float64, true),
        Field::new(ARTIST_LONGITUDE_FIELD, DataType::Float64, true),
        Field::new(ARTIST_LOCATION_FIELD, DataType::Utf8, true),
        Field::new(ARTIST_NAME_FIELD, DataType::Utf8, true),
        Field::new(SONG_ID_FIELD, DataType::Utf8, true),
        Field::new(TITLE_FIELD, DataType::Utf8, true),
        Field::new(DURATION_FIELD, DataType::Float64, true),
        Field::new(YEAR_FIELD, DataType::Int64, true),
    ]))
}

/// Schema of one usage log record
pub fn usage_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(USAGE_ARTIST_FIELD, DataType::Utf8, true),
        Field::new("auth", DataType::Utf8, true),
        Field::new(USAGE_FIRST_NAME_FIELD, DataType::Utf8, true),
        Field::new(USAGE_GENDER_FIELD, DataType::Utf8, true),
        Field::new("itemInSession", DataType::Int64, true),
        Field::new(USAGE_LAST_NAME_FIELD, DataType::Utf8, true),
        Field::new("length", DataType::Float64, true),
        Field::new(USAGE_LEVEL_FIELD, DataType::Utf8, true),
        Field::new(USAGE_LOCATION_FIELD, DataType::Utf8, true),
        Field::new("method", DataType::Utf8, true),
        Field::new(USAGE_PAGE_FIELD, DataType::Utf8, true),
        Field::new("registration", DataType::Float64, true),
        Field::new(USAGE_SESSION_ID_FIELD, DataType::Int64, true),
        Field::new(USAGE_SONG_FIELD, DataType::Utf8, true),
        Field::new("status", DataType::Int64, true),
        Field::new(USAGE_TS_FIELD, DataType::Int64, true),
        Field::new(USAGE_USER_AGENT_FIELD, DataType::Utf8, true),
        Field::new(USAGE_USER_ID_FIELD, DataType::Utf8, true),
    ]))
}
