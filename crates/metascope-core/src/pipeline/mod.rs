//! Processing pipeline components.
//!
//! - **input**: bounded single read of each input file
//! - **discovery**: expand directories into input files
//! - **processor**: per-file extraction and GPS decoding
//! - **batch**: bounded-concurrency driver over many files

pub mod batch;
pub mod discovery;
pub mod input;
pub mod processor;

// Re-exports for convenient access
pub use batch::{BatchOutcome, BatchProcessor};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use input::{display_name, InputReader};
pub use processor::MetadataPipeline;
