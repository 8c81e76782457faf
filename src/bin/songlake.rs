//! songlake ETL binary
//!
//! Reads the song catalog and usage logs, writes the five star-schema tables
//! and prints a JSON run summary to stdout.

use songlake::config::{ConfigFile, PathsSection, PipelineSection};
use songlake::pipeline::Pipeline;
use songlake::telemetry::{init_telemetry, LogFormat};
use songlake::StorageConfig;

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

/// Restructure song catalog and usage logs into partitioned Parquet tables
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file; flags and environment override it
    #[arg(long, env = "SONGLAKE_CONFIG")]
    config: Option<PathBuf>,

    /// Input root holding song_data/ and log_data/
    #[arg(long, env = "SONGLAKE_INPUT")]
    input: Option<String>,

    /// Catalog location (defaults to <input>/song_data)
    #[arg(long, env = "SONGLAKE_SONG_DATA")]
    song_data: Option<String>,

    /// Usage log location (defaults to <input>/log_data)
    #[arg(long, env = "SONGLAKE_LOG_DATA")]
    log_data: Option<String>,

    /// Output root
    #[arg(long, env = "SONGLAKE_OUTPUT")]
    output: Option<String>,

    /// Fixed UTC offset for calendar columns (UTC, +HH:MM)
    #[arg(long, env = "SONGLAKE_TIMEZONE")]
    timezone: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    aws_region: Option<String>,

    /// Custom S3 endpoint (MinIO, LocalStack)
    #[arg(long, env = "S3_ENDPOINT")]
    aws_endpoint: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true, hide = true)]
    aws_access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true, hide = true)]
    aws_secret_access_key: Option<String>,

    /// Record files fetched concurrently per source
    #[arg(long, env = "SONGLAKE_READ_CONCURRENCY")]
    read_concurrency: Option<usize>,

    /// Zstandard level for Parquet output (1-22)
    #[arg(long, env = "SONGLAKE_COMPRESSION_LEVEL")]
    compression_level: Option<i32>,

    /// Log level
    #[arg(long, env = "SONGLAKE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, text)
    #[arg(long, env = "SONGLAKE_LOG_FORMAT", default_value = "json")]
    log_format: String,
}

impl Args {
    fn overrides(&self) -> ConfigFile {
        ConfigFile {
            aws: StorageConfig {
                access_key_id: self.aws_access_key_id.clone(),
                secret_access_key: self.aws_secret_access_key.clone(),
                region: self.aws_region.clone(),
                endpoint: self.aws_endpoint.clone(),
            },
            paths: PathsSection {
                input: self.input.clone(),
                song_data: self.song_data.clone(),
                log_data: self.log_data.clone(),
                output: self.output.clone(),
            },
            pipeline: PipelineSection {
                timezone: self.timezone.clone(),
                read_concurrency: self.read_concurrency,
                compression_level: self.compression_level,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    init_telemetry(&args.log_level, args.log_format.parse::<LogFormat>()?)?;

    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let config = args.overrides().or(file).resolve()?;

    info!(
        catalog = %config.catalog_location,
        usage = %config.usage_location,
        output = %config.output_location,
        timezone = %config.timezone,
        storage = ?config.storage,
        "Starting songlake"
    );

    let pipeline = Pipeline::from_config(&config)?;
    let summary = match pipeline.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!(category = ?e.category(), error = %e, "Run failed");
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
