//! Metascope Core - embeddable media metadata extraction.
//!
//! Metascope reads arbitrary media files (images, audio, video, documents),
//! lists the metadata stored in their containers as human-readable lines, and
//! turns EXIF GPS tags into decimal coordinates with a map link.
//!
//! # Architecture
//!
//! Each file flows through two independent stages whose results are
//! assembled into one report:
//!
//! ```text
//!          ┌─> ContainerExtractor ──> fields ───────┐
//! bytes ───┤                                        ├─> ExtractionReport
//!          └─> ExifTagReader ──> GpsDecoder ──> gps ┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use metascope_core::{Config, MediaFile, MetadataPipeline};
//!
//! #[tokio::main]
//! async fn main() -> metascope_core::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = MetadataPipeline::new(&config);
//!
//!     let report = pipeline.process_path("./photo.jpg".as_ref()).await;
//!     println!("{}", report.to_text());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod gps;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod tags;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    ConfigError, ExtractionError, InputError, MetascopeError, ParseError, Result, TagReadError,
};
pub use export::ArchiveExporter;
pub use extract::{ContainerExtractor, Extraction, FieldSink, FormatHandler, FormatRegistry};
pub use gps::GpsDecoder;
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{
    BatchOutcome, BatchProcessor, DiscoveredFile, FileDiscovery, InputReader, MetadataPipeline,
};
pub use report::assemble;
pub use tags::ExifTagReader;
pub use types::{
    BatchStats, ExifTagSet, ExtractionReport, FileReport, GpsCoordinate, MediaFile, MetadataField,
    Rational, ReportStatus, TagValue,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
