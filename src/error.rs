//! Error types for songlake

use std::fmt;

/// Result type alias for songlake operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for songlake
#[derive(Debug)]
pub enum Error {
    /// Arrow-related errors
    Arrow(arrow::error::ArrowError),
    /// DataFusion errors
    DataFusion(datafusion::error::DataFusionError),
    /// Parquet-related errors
    Parquet(parquet::errors::ParquetError),
    /// Object store errors
    ObjectStore(object_store::Error),
    /// IO errors
    Io(std::io::Error),
    /// Serialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// A configured input location could not be opened
    InputAccess { location: String, message: String },
    /// A configured input location holds no matching record files
    NoInputFiles { location: String, extension: String },
    /// A record file does not decode against its declared schema
    MalformedRecord { path: String, message: String },
    /// Projection, join or column shape mismatch
    InvalidSchema(String),
    /// Per-row derivation failure (timestamp decomposition)
    Derivation(String),
    /// A partition column holds a null value
    NullPartitionValue { table: String, column: String, row: usize },
    /// Persisting a table failed
    Write { table: String, message: String },
    /// Internal error
    Internal(String),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InputAccess,
    MalformedRecord,
    Derivation,
    Write,
    Config,
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InputAccess { .. } | Error::NoInputFiles { .. } => ErrorCategory::InputAccess,
            Error::MalformedRecord { .. } | Error::Serialization(_) => {
                ErrorCategory::MalformedRecord
            }
            Error::Derivation(_)
            | Error::InvalidSchema(_)
            | Error::Arrow(_)
            | Error::DataFusion(_) => {
                ErrorCategory::Derivation
            }
            Error::Write { .. }
            | Error::NullPartitionValue { .. }
            | Error::Parquet(_)
            | Error::ObjectStore(_)
            | Error::Io(_) => ErrorCategory::Write,
            Error::Config(_) => ErrorCategory::Config,
            Error::Internal(_) => ErrorCategory::Internal,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Arrow(e) => Some(e),
            Error::DataFusion(e) => Some(e),
            Error::Parquet(e) => Some(e),
            Error::ObjectStore(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Arrow(e) => write!(f, "Arrow error: {}", e),
            Error::DataFusion(e) => write!(f, "DataFusion error: {}", e),
            Error::Parquet(e) => write!(f, "Parquet error: {}", e),
            Error::ObjectStore(e) => write!(f, "Object store error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InputAccess { location, message } => {
                write!(f, "Cannot access input {}: {}", location, message)
            }
            Error::NoInputFiles {
                location,
                extension,
            } => write!(f, "No .{} files found under {}", extension, location),
            Error::MalformedRecord { path, message } => {
                write!(f, "Malformed record in {}: {}", path, message)
            }
            Error::InvalidSchema(msg) => write!(f, "Invalid schema: {}", msg),
            Error::Derivation(msg) => write!(f, "Derivation error: {}", msg),
            Error::NullPartitionValue { table, column, row } => write!(
                f,
                "Null partition value in {}.{} at row {}",
                table, column, row
            ),
            Error::Write { table, message } => {
                write!(f, "Failed to write table {}: {}", table, message)
            }
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(e: arrow::error::ArrowError) -> Self {
        Error::Arrow(e)
    }
}

impl From<datafusion::error::DataFusionError> for Error {
    fn from(e: datafusion::error::DataFusionError) -> Self {
        Error::DataFusion(e)
    }
}

impl From<parquet::errors::ParquetError> for Error {
    fn from(e: parquet::errors::ParquetError) -> Self {
        Error::Parquet(e)
    }
}

impl From<object_store::Error> for Error {
    fn from(e: object_store::Error) -> Self {
        Error::ObjectStore(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}
