//! Error types for the Metascope extraction engine.
//!
//! Errors are split by audience: [`MetascopeError`] and [`ConfigError`] are
//! returned to the caller of the library, while [`ExtractionError`] is the
//! per-file taxonomy that ends up as warning lines inside a report and never
//! aborts a batch.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::MetadataField;

/// Top-level error type for Metascope operations.
#[derive(Error, Debug)]
pub enum MetascopeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Zip archive export errors
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-file extraction outcomes that are reported rather than propagated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// No registered handler recognized the content.
    #[error("File could not be parsed: unrecognized format.")]
    UnrecognizedFormat,

    /// A handler recognized the format but its structure broke partway.
    ///
    /// `partial` keeps every field read before the failure.
    #[error("Corrupt {format} data: {detail}")]
    Corrupt {
        format: String,
        detail: String,
        partial: Vec<MetadataField>,
    },

    /// A GPS rational or hemisphere reference could not be decoded.
    #[error("Invalid GPS value in {tag}: {detail}")]
    InvalidRational { tag: String, detail: String },

    /// Format recognized, but it carries no metadata.
    #[error("No metadata found in {format} file.")]
    NoMetadataFound { format: String },
}

impl ExtractionError {
    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnrecognizedFormat => "unrecognized_format",
            Self::Corrupt { .. } => "corrupt",
            Self::InvalidRational { .. } => "invalid_rational",
            Self::NoMetadataFound { .. } => "no_metadata_found",
        }
    }
}

/// Structural errors raised inside a format handler.
///
/// These never leave the extractor: the registry converts them into
/// [`ExtractionError::Corrupt`] together with the fields read so far.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The data ended before a structure was complete.
    #[error("unexpected end of data at offset {offset} (needed {needed} more bytes)")]
    Truncated { offset: usize, needed: usize },

    /// A structure was present but its contents are inconsistent.
    #[error("{0}")]
    Invalid(String),
}

/// Failures of the EXIF tag reader collaborator.
#[derive(Error, Debug)]
pub enum TagReadError {
    /// The container holds no EXIF block.
    #[error("no EXIF data present")]
    NotFound,

    /// The EXIF block exists but could not be decoded.
    #[error("EXIF data could not be read: {0}")]
    Malformed(String),
}

/// Errors reading an input file before extraction starts.
#[derive(Error, Debug)]
pub enum InputError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// The file exists but could not be read
    #[error("Cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

/// Convenience type alias for Metascope results.
pub type Result<T> = std::result::Result<T, MetascopeError>;

/// Convenience type alias for handler-internal parse results.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
