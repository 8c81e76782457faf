//! Configuration resolution and the object store factory
//!
//! A run is configured from an optional YAML file layered under CLI flags and
//! environment variables. [`ConfigFile::resolve`] validates the merged layers
//! into a [`Config`]; [`ComponentFactory`] turns its locations into object
//! stores.

use crate::extract::parse_utc_offset;
use crate::source::DEFAULT_READ_CONCURRENCY;
use crate::writer::DEFAULT_COMPRESSION_LEVEL;
use crate::{Config, Error, Result, StorageConfig};

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::ObjectStore;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Catalog sub-directory of an input root
pub const SONG_DATA_DIR: &str = "song_data";
/// Usage log sub-directory of an input root
pub const LOG_DATA_DIR: &str = "log_data";

const DEFAULT_REGION: &str = "us-east-1";

/// On-disk configuration file.
///
/// ```yaml
/// aws:
///   access_key_id: "..."
///   secret_access_key: "..."
///   region: us-west-2
/// paths:
///   input: s3a://udacity-dend
///   output: s3a://my-lake/star
/// pipeline:
///   timezone: UTC
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub aws: StorageConfig,
    pub paths: PathsSection,
    pub pipeline: PipelineSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsSection {
    /// Root holding `song_data/` and `log_data/`
    pub input: Option<String>,
    pub song_data: Option<String>,
    pub log_data: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    pub timezone: Option<String>,
    pub read_concurrency: Option<usize>,
    pub compression_level: Option<i32>,
}

impl ConfigFile {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Layer `self` over `other`: values set in `self` win
    pub fn or(self, other: ConfigFile) -> ConfigFile {
        ConfigFile {
            aws: self.aws.or(other.aws),
            paths: PathsSection {
                input: self.paths.input.or(other.paths.input),
                song_data: self.paths.song_data.or(other.paths.song_data),
                log_data: self.paths.log_data.or(other.paths.log_data),
                output: self.paths.output.or(other.paths.output),
            },
            pipeline: PipelineSection {
                timezone: self.pipeline.timezone.or(other.pipeline.timezone),
                read_concurrency: self
                    .pipeline
                    .read_concurrency
                    .or(other.pipeline.read_concurrency),
                compression_level: self
                    .pipeline
                    .compression_level
                    .or(other.pipeline.compression_level),
            },
        }
    }

    /// Validate and fill defaults.
    ///
    /// Catalog and usage locations fall back to `<input>/song_data` and
    /// `<input>/log_data`; the output location is required.
    pub fn resolve(self) -> Result<Config> {
        let input = self.paths.input.as_deref();
        let catalog_location = self
            .paths
            .song_data
            .or_else(|| input.map(|root| join_location(root, SONG_DATA_DIR)))
            .ok_or_else(|| {
                Error::Config("no catalog location: set paths.input or paths.song_data".into())
            })?;
        let usage_location = self
            .paths
            .log_data
            .or_else(|| input.map(|root| join_location(root, LOG_DATA_DIR)))
            .ok_or_else(|| {
                Error::Config("no usage location: set paths.input or paths.log_data".into())
            })?;
        let output_location = self
            .paths
            .output
            .ok_or_else(|| Error::Config("no output location: set paths.output".into()))?;

        let timezone = parse_utc_offset(self.pipeline.timezone.as_deref().unwrap_or("UTC"))?;

        let read_concurrency = self
            .pipeline
            .read_concurrency
            .unwrap_or(DEFAULT_READ_CONCURRENCY);
        if read_concurrency == 0 {
            return Err(Error::Config(
                "read_concurrency must be at least 1".to_string(),
            ));
        }

        let compression_level = self
            .pipeline
            .compression_level
            .unwrap_or(DEFAULT_COMPRESSION_LEVEL);
        if !(1..=22).contains(&compression_level) {
            return Err(Error::Config(format!(
                "compression_level {} out of range, expected 1..=22",
                compression_level
            )));
        }

        for location in [&catalog_location, &usage_location, &output_location] {
            parse_location(location)?;
        }

        Ok(Config {
            catalog_location,
            usage_location,
            output_location,
            storage: self.aws,
            timezone,
            read_concurrency,
            compression_level,
        })
    }
}

/// Append a child directory to a location URI or path
pub fn join_location(root: &str, child: &str) -> String {
    if root.ends_with("://") {
        format!("{}{}", root, child)
    } else {
        format!("{}/{}", root.trim_end_matches('/'), child)
    }
}

/// A parsed storage location
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    S3 { bucket: String, prefix: String },
    Local(PathBuf),
    Memory(String),
}

fn parse_location(raw: &str) -> Result<Location> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::Config("empty location".to_string()));
    }

    if let Some(rest) = raw
        .strip_prefix("s3://")
        .or_else(|| raw.strip_prefix("s3a://"))
    {
        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(Error::Config(format!("missing bucket in location '{}'", raw)));
        }
        return Ok(Location::S3 {
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        });
    }
    if let Some(rest) = raw.strip_prefix("memory://") {
        return Ok(Location::Memory(rest.trim_matches('/').to_string()));
    }
    if let Some(rest) = raw.strip_prefix("file://") {
        return Ok(Location::Local(PathBuf::from(rest)));
    }
    if let Some((scheme, _)) = raw.split_once("://") {
        return Err(Error::Config(format!(
            "unsupported location scheme '{}' in '{}'. Use s3, s3a, file or memory",
            scheme, raw
        )));
    }
    Ok(Location::Local(PathBuf::from(raw)))
}

/// Builds object stores for configured locations.
///
/// Every `memory://` location opened through one factory shares a single
/// in-process store.
#[derive(Debug, Clone)]
pub struct ComponentFactory {
    storage: StorageConfig,
    memory: Arc<InMemory>,
}

impl ComponentFactory {
    pub fn new(storage: StorageConfig) -> Self {
        Self::with_memory_store(storage, Arc::new(InMemory::new()))
    }

    /// Use `memory` as the backing store for `memory://` locations
    pub fn with_memory_store(storage: StorageConfig, memory: Arc<InMemory>) -> Self {
        Self { storage, memory }
    }

    /// Open an input root. A missing local directory is an input error.
    pub fn open_input(&self, location: &str) -> Result<(Arc<dyn ObjectStore>, Path)> {
        self.open(location, false)
    }

    /// Open an output root, creating a missing local directory
    pub fn open_output(&self, location: &str) -> Result<(Arc<dyn ObjectStore>, Path)> {
        self.open(location, true)
    }

    fn open(&self, location: &str, create: bool) -> Result<(Arc<dyn ObjectStore>, Path)> {
        match parse_location(location)? {
            Location::S3 { bucket, prefix } => {
                let region = self.storage.region.as_deref().unwrap_or(DEFAULT_REGION);
                info!(bucket = %bucket, prefix = %prefix, region, "Using S3 object store");

                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(&bucket)
                    .with_region(region);

                // Custom endpoints (MinIO, LocalStack)
                if let Some(endpoint) = &self.storage.endpoint {
                    info!(endpoint = %endpoint, "Using custom S3 endpoint");
                    builder = builder.with_endpoint(endpoint).with_allow_http(true);
                }

                // Explicit credentials if provided, otherwise the ambient provider chain
                if let Some(key) = &self.storage.access_key_id {
                    builder = builder.with_access_key_id(key);
                }
                if let Some(secret) = &self.storage.secret_access_key {
                    builder = builder.with_secret_access_key(secret);
                }

                let store = builder.build().map_err(|e| {
                    Error::Config(format!("failed to configure S3 for {}: {}", location, e))
                })?;
                Ok((Arc::new(store), Path::from(prefix.as_str())))
            }
            Location::Local(dir) => {
                if create {
                    std::fs::create_dir_all(&dir)?;
                } else if !dir.is_dir() {
                    return Err(Error::InputAccess {
                        location: location.to_string(),
                        message: "not an existing directory".to_string(),
                    });
                }
                info!(path = %dir.display(), "Using local filesystem store");

                let store = LocalFileSystem::new_with_prefix(&dir).map_err(|e| {
                    Error::InputAccess {
                        location: location.to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok((Arc::new(store), Path::default()))
            }
            Location::Memory(prefix) => {
                info!(prefix = %prefix, "Using in-memory object store");
                Ok((self.memory.clone(), Path::from(prefix.as_str())))
            }
        }
    }
}
