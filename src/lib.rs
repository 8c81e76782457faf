//! # songlake
//!
//! Batch ETL that restructures a song catalog and application usage logs into
//! a star schema stored as partitioned Parquet.
//!
//! ## Tables
//!
//! - **songs**: distinct songs, partitioned by `year` / `artist_id`
//! - **artists**: distinct artists
//! - **users**: distinct users seen in playback events
//! - **time**: calendar decomposition of every playback timestamp,
//!   partitioned by `year` / `month`
//! - **songplays**: playback events matched to the catalog on
//!   (artist name, song title), partitioned by `year` / `month`
//!
//! ## Architecture
//!
//! - **Source**: discovers and decodes JSON record files under a prefix
//! - **Engine**: DataFusion session that executes the filter, projection,
//!   dedup and join plans
//! - **Extractors**: derive the catalog and usage tables
//! - **Writer**: overwrites each table's directory with Hive-partitioned Parquet

pub mod config;
pub mod engine;
pub mod extract;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod telemetry;
pub mod writer;

mod error;

pub use error::{Error, ErrorCategory, Result};

use chrono::FixedOffset;
use serde::Deserialize;
use std::fmt;

/// Configuration for one ETL run
#[derive(Debug, Clone)]
pub struct Config {
    /// Root location of the song catalog records
    pub catalog_location: String,
    /// Root location of the usage log records
    pub usage_location: String,
    /// Root location the five tables are written beneath
    pub output_location: String,
    /// Object storage credentials and endpoint
    pub storage: StorageConfig,
    /// Time zone used for calendar decomposition
    pub timezone: FixedOffset,
    /// Number of record files fetched concurrently per source
    pub read_concurrency: usize,
    /// Zstandard level for Parquet output
    pub compression_level: i32,
}

/// Object storage configuration.
///
/// Passed explicitly to [`config::ComponentFactory`]; nothing is exported into
/// the process environment.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    /// Custom S3-compatible endpoint (MinIO, LocalStack)
    pub endpoint: Option<String>,
}

impl StorageConfig {
    /// Fill unset fields from `other`
    pub fn or(self, other: StorageConfig) -> StorageConfig {
        StorageConfig {
            access_key_id: self.access_key_id.or(other.access_key_id),
            secret_access_key: self.secret_access_key.or(other.secret_access_key),
            region: self.region.or(other.region),
            endpoint: self.endpoint.or(other.endpoint),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("StorageConfig")
            .field("access_key_id", &redact(&self.access_key_id))
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
