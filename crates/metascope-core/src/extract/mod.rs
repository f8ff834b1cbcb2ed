//! Container metadata extraction.
//!
//! The format is detected from content only. A fixed [`FormatRegistry`] holds
//! one [`FormatHandler`] per supported container; handlers are tried in
//! registration order and the first whose `sniff` matches reads the fields.
//!
//! Handlers:
//! - **jpeg**: JFIF/EXIF/COM segments and frame header
//! - **png**: IHDR and text/time/physical chunks
//! - **gif**: screen descriptor, comments, frames, loop count
//! - **riff**: WebP, WAV and AVI chunk trees
//! - **tiff**: IFD tags
//! - **bmp**: bitmap info header
//! - **flac**: STREAMINFO and Vorbis comments
//! - **isobmff**: MP4/QuickTime/HEIF box tree
//! - **pdf**: document information dictionary
//! - **mp3**: ID3v2 frames and MPEG audio frame header

pub mod bmp;
pub mod cursor;
pub(crate) mod exif_fields;
pub mod flac;
pub mod gif;
pub mod isobmff;
pub mod jpeg;
pub mod mp3;
pub mod pdf;
pub mod png;
pub mod riff;
pub mod tiff;

use crate::error::{ExtractionError, ParseResult};
use crate::types::MetadataField;

/// A parser for one container format.
pub trait FormatHandler: Send + Sync {
    /// Short display name ("JPEG", "PNG", ...).
    fn name(&self) -> &'static str;

    /// One-line description for format listings.
    fn description(&self) -> &'static str;

    /// Whether the leading bytes look like this format.
    fn sniff(&self, bytes: &[u8]) -> bool;

    /// Walk the metadata section and push fields in container order.
    ///
    /// Fields pushed before an error is returned are kept as partial output.
    fn read_fields(&self, bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()>;
}

/// Ordered output of a handler: fields plus non-fatal warnings.
#[derive(Debug, Default)]
pub struct FieldSink {
    fields: Vec<MetadataField>,
    warnings: Vec<String>,
}

impl FieldSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.fields.push(MetadataField::new(label, value));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn fields(&self) -> &[MetadataField] {
        &self.fields
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn into_parts(self) -> (Vec<MetadataField>, Vec<String>) {
        (self.fields, self.warnings)
    }
}

/// Successful extraction of one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Name of the handler that recognized the content
    pub format: &'static str,
    /// Fields in container order
    pub fields: Vec<MetadataField>,
    /// Non-fatal warnings (including "no metadata found")
    pub warnings: Vec<String>,
}

/// Handlers in priority order.
pub struct FormatRegistry {
    handlers: Vec<Box<dyn FormatHandler>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registry with every built-in handler.
    ///
    /// Order matters only where sniffs could overlap: the loose MPEG frame
    /// sync check stays last.
    pub fn with_default_handlers() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(jpeg::JpegHandler));
        registry.register(Box::new(png::PngHandler));
        registry.register(Box::new(gif::GifHandler));
        registry.register(Box::new(riff::WebpHandler));
        registry.register(Box::new(riff::WavHandler));
        registry.register(Box::new(riff::AviHandler));
        registry.register(Box::new(tiff::TiffHandler));
        registry.register(Box::new(bmp::BmpHandler));
        registry.register(Box::new(flac::FlacHandler));
        registry.register(Box::new(isobmff::IsoBmffHandler));
        registry.register(Box::new(pdf::PdfHandler));
        registry.register(Box::new(mp3::Mp3Handler));
        registry
    }

    /// Append a handler at the lowest priority.
    pub fn register(&mut self, handler: Box<dyn FormatHandler>) {
        self.handlers.push(handler);
    }

    /// First handler whose sniff matches.
    pub fn detect(&self, bytes: &[u8]) -> Option<&dyn FormatHandler> {
        self.handlers
            .iter()
            .map(|h| h.as_ref())
            .find(|h| h.sniff(bytes))
    }

    pub fn handlers(&self) -> impl Iterator<Item = &dyn FormatHandler> {
        self.handlers.iter().map(|h| h.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Detects the container and reads its metadata fields.
///
/// Stateless apart from the registry, so one instance can be shared across
/// concurrent extractions.
#[derive(Default)]
pub struct ContainerExtractor {
    registry: FormatRegistry,
}

impl ContainerExtractor {
    /// Extractor with every built-in handler.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: FormatRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Extract the metadata fields of `bytes`.
    ///
    /// - No handler matches: [`ExtractionError::UnrecognizedFormat`]
    /// - Structural failure: [`ExtractionError::Corrupt`] with partial fields
    /// - Empty metadata: `Ok` with no fields and a "no metadata" warning
    pub fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractionError> {
        let handler = self
            .registry
            .detect(bytes)
            .ok_or(ExtractionError::UnrecognizedFormat)?;
        let format = handler.name();
        tracing::debug!("Detected {} container ({} bytes)", format, bytes.len());

        let mut sink = FieldSink::new();
        let outcome = handler.read_fields(bytes, &mut sink);
        let (fields, mut warnings) = sink.into_parts();

        if let Err(e) = outcome {
            tracing::debug!("{} structure broke after {} fields: {}", format, fields.len(), e);
            return Err(ExtractionError::Corrupt {
                format: format.to_string(),
                detail: e.to_string(),
                partial: fields,
            });
        }

        if fields.is_empty() {
            warnings.push(
                ExtractionError::NoMetadataFound {
                    format: format.to_string(),
                }
                .to_string(),
            );
        }

        Ok(Extraction {
            format,
            fields,
            warnings,
        })
    }
}

/// Human-readable duration ("1 min 5 sec 250 ms").
pub(crate) fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return String::new();
    }
    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let ms = total_ms % 1000;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours} hours"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} min"));
    }
    if secs > 0 {
        parts.push(format!("{secs} sec"));
    }
    if ms > 0 || parts.is_empty() {
        parts.push(format!("{ms} ms"));
    }
    parts.join(" ")
}

/// Pixels-per-metre to dots-per-inch, rounded.
pub(crate) fn ppm_to_dpi(ppm: f64) -> u32 {
    (ppm * 0.0254).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    struct FixedHandler {
        name: &'static str,
        magic: &'static [u8],
        fail_after: Option<usize>,
        fields: usize,
    }

    impl FormatHandler for FixedHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "test handler"
        }

        fn sniff(&self, bytes: &[u8]) -> bool {
            bytes.starts_with(self.magic)
        }

        fn read_fields(&self, _bytes: &[u8], sink: &mut FieldSink) -> ParseResult<()> {
            for i in 0..self.fields {
                if self.fail_after == Some(i) {
                    return Err(ParseError::Truncated {
                        offset: i,
                        needed: 1,
                    });
                }
                sink.push(format!("Field {i}"), "value");
            }
            Ok(())
        }
    }

    fn registry_of(handlers: Vec<FixedHandler>) -> ContainerExtractor {
        let mut registry = FormatRegistry::new();
        for handler in handlers {
            registry.register(Box::new(handler));
        }
        ContainerExtractor::with_registry(registry)
    }

    #[test]
    fn test_unrecognized_on_empty_input() {
        let extractor = ContainerExtractor::new();
        assert_eq!(
            extractor.extract(&[]),
            Err(ExtractionError::UnrecognizedFormat)
        );
    }

    #[test]
    fn test_unrecognized_on_text() {
        let extractor = ContainerExtractor::new();
        let result = extractor.extract(b"hello, this is not a media file at all");
        assert_eq!(result, Err(ExtractionError::UnrecognizedFormat));
    }

    #[test]
    fn test_first_registered_match_wins() {
        let extractor = registry_of(vec![
            FixedHandler {
                name: "first",
                magic: b"AB",
                fail_after: None,
                fields: 1,
            },
            FixedHandler {
                name: "second",
                magic: b"ABC",
                fail_after: None,
                fields: 1,
            },
        ]);
        let extraction = extractor.extract(b"ABCD").unwrap();
        assert_eq!(extraction.format, "first");
    }

    #[test]
    fn test_corrupt_keeps_partial_fields() {
        let extractor = registry_of(vec![FixedHandler {
            name: "broken",
            magic: b"X",
            fail_after: Some(2),
            fields: 5,
        }]);
        match extractor.extract(b"X") {
            Err(ExtractionError::Corrupt {
                format, partial, ..
            }) => {
                assert_eq!(format, "broken");
                assert_eq!(partial.len(), 2);
                assert_eq!(partial[1].label, "Field 1");
            }
            other => panic!("Expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_metadata_is_a_warning() {
        let extractor = registry_of(vec![FixedHandler {
            name: "bare",
            magic: b"B",
            fail_after: None,
            fields: 0,
        }]);
        let extraction = extractor.extract(b"B").unwrap();
        assert!(extraction.fields.is_empty());
        assert_eq!(extraction.warnings, vec!["No metadata found in bare file."]);
    }

    #[test]
    fn test_sink_skips_empty_values() {
        let mut sink = FieldSink::new();
        sink.push("Title", "");
        sink.push("Artist", "Someone");
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_default_registry_order() {
        let registry = FormatRegistry::with_default_handlers();
        let names: Vec<_> = registry.handlers().map(|h| h.name()).collect();
        assert_eq!(names.first(), Some(&"JPEG"));
        assert_eq!(names.last(), Some(&"MP3"));
        assert_eq!(registry.len(), 12);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(65.25), "1 min 5 sec 250 ms");
        assert_eq!(format_duration(3600.0), "1 hours");
        assert_eq!(format_duration(0.0), "0 ms");
    }
}
