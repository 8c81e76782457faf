//! Table extraction
//!
//! Two independent extractors turn raw record sources into the star schema:
//! - [`CatalogExtractor`]: `songs` and `artists` from catalog records
//! - [`UsageExtractor`]: `users`, `time` and the `songplays` fact table from
//!   usage logs, the latter joined against a second read of the catalog
//!
//! The derivation rules are plain functions from one DataFusion `DataFrame`
//! plan to another, so they can be exercised without any storage.

pub mod calendar;
mod catalog;
mod usage;

pub use calendar::{decompose_timestamp, parse_utc_offset, with_calendar_columns, CalendarFields};
pub use catalog::{artists_table, songs_table, CatalogExtractor};
pub use usage::{playback_events, songplays_table, time_table, users_table, UsageExtractor};
