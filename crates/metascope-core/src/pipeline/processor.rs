//! Per-file orchestration: container extraction and GPS decoding side by
//! side, then report assembly.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::ExtractionError;
use crate::extract::ContainerExtractor;
use crate::gps::GpsDecoder;
use crate::report::assemble;
use crate::tags::ExifTagReader;
use crate::types::{FileReport, GpsCoordinate, MediaFile, ReportStatus};

use super::input::{display_name, InputReader};

/// Turns inputs into [`FileReport`]s.
///
/// Every call produces exactly one report; failures end up as warning lines
/// instead of errors.
pub struct MetadataPipeline {
    extractor: Arc<ContainerExtractor>,
    input: InputReader,
}

impl MetadataPipeline {
    /// Create a pipeline with the default format registry.
    pub fn new(config: &Config) -> Self {
        Self::with_extractor(config, ContainerExtractor::new())
    }

    /// Create a pipeline around a custom extractor.
    pub fn with_extractor(config: &Config, extractor: ContainerExtractor) -> Self {
        Self {
            extractor: Arc::new(extractor),
            input: InputReader::new(config.limits.clone()),
        }
    }

    pub fn extractor(&self) -> &ContainerExtractor {
        &self.extractor
    }

    /// Read `path` once and process it.
    pub async fn process_path(&self, path: &Path) -> FileReport {
        match self.input.read(path).await {
            Ok(file) => self.process(file).await,
            Err(e) => {
                tracing::warn!("Cannot read {:?}: {}", path, e);
                FileReport::new(
                    display_name(path),
                    ReportStatus::Unreadable,
                    assemble(None, Vec::new(), None, vec![e.to_string()]),
                )
            }
        }
    }

    /// Process an in-memory file.
    pub async fn process(&self, file: MediaFile) -> FileReport {
        let start = Instant::now();
        let MediaFile { name, bytes, .. } = file;
        tracing::debug!("Processing: {} ({} bytes)", name, bytes.len());
        let bytes: Arc<[u8]> = Arc::from(bytes);

        let extractor = Arc::clone(&self.extractor);
        let container_bytes = Arc::clone(&bytes);
        let container = tokio::task::spawn_blocking(move || {
            let stage = Instant::now();
            let result = extractor.extract(&container_bytes);
            tracing::trace!("  Container: {:?}", stage.elapsed());
            result
        });

        let gps_bytes = Arc::clone(&bytes);
        let location = tokio::task::spawn_blocking(move || {
            let stage = Instant::now();
            let result = locate(&gps_bytes);
            tracing::trace!("  GPS: {:?}", stage.elapsed());
            result
        });

        let (container, location) = tokio::join!(container, location);

        let mut warnings = Vec::new();
        let (status, format, fields) = match container {
            Ok(Ok(extraction)) => {
                warnings.extend(extraction.warnings);
                (
                    ReportStatus::Parsed,
                    Some(extraction.format.to_string()),
                    extraction.fields,
                )
            }
            Ok(Err(err)) => {
                warnings.push(err.to_string());
                match err {
                    ExtractionError::Corrupt {
                        format, partial, ..
                    } => {
                        tracing::warn!("{}: corrupt {} data", name, format);
                        (ReportStatus::Corrupt, Some(format), partial)
                    }
                    _ => {
                        tracing::debug!("{}: unrecognized format", name);
                        (ReportStatus::Unrecognized, None, Vec::new())
                    }
                }
            }
            Err(e) => {
                tracing::error!("{}: extraction task failed: {}", name, e);
                warnings.push(format!("Extraction failed: {e}"));
                (ReportStatus::Corrupt, None, Vec::new())
            }
        };

        let gps = match location {
            Ok(Ok(coord)) => coord,
            Ok(Err(err)) => {
                tracing::warn!("{}: {}", name, err);
                warnings.push(err.to_string());
                None
            }
            Err(e) => {
                tracing::error!("{}: GPS task failed: {}", name, e);
                warnings.push(format!("GPS decoding failed: {e}"));
                None
            }
        };

        tracing::debug!(
            "Processed {} in {:?} ({} fields, gps: {})",
            name,
            start.elapsed(),
            fields.len(),
            gps.is_some()
        );

        FileReport::new(name, status, assemble(format.as_deref(), fields, gps, warnings))
    }
}

/// Read the EXIF tags and decode the location. A missing or unreadable tag
/// block just means there is no location.
fn locate(bytes: &[u8]) -> Result<Option<GpsCoordinate>, ExtractionError> {
    match ExifTagReader::read(bytes) {
        Ok(tags) => GpsDecoder::decode(&tags),
        Err(e) => {
            tracing::trace!("  No EXIF tags: {}", e);
            Ok(None)
        }
    }
}
