//! Core data types shared by the extractor, the GPS decoder and the report
//! assembler.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single human-readable metadata line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    /// Field label (e.g., "Image width")
    pub label: String,

    /// Display value (e.g., "640 pixels")
    pub value: String,
}

impl MetadataField {
    /// Create a new field.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

/// An opaque input: a display name and the bytes read from it.
///
/// Owned by the caller; the core never keeps it past one extraction call.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Name used to key the report (usually the file name)
    pub name: String,

    /// Raw file contents
    pub bytes: Vec<u8>,

    /// Format name once detected by the extractor
    pub format: Option<String>,
}

impl MediaFile {
    /// Wrap in-memory bytes under a display name.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            format: None,
        }
    }
}

/// An unsigned EXIF rational (numerator / denominator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub num: u32,
    pub denom: u32,
}

impl Rational {
    pub fn new(num: u32, denom: u32) -> Self {
        Self { num, denom }
    }

    /// Real-valued quotient, or `None` when the denominator is zero.
    pub fn checked_value(&self) -> Option<f64> {
        if self.denom == 0 {
            None
        } else {
            Some(f64::from(self.num) / f64::from(self.denom))
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.denom)
    }
}

/// Raw value of one EXIF tag as seen by the GPS decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    /// One or more rationals (e.g., degree/minute/second triples)
    Rationals(Vec<Rational>),

    /// ASCII text such as hemisphere references ("N", "S", "E", "W")
    Text(String),

    /// Any other value, kept in display form
    Other(String),
}

/// Tag name to value mapping produced by the tag reader.
///
/// Names follow EXIF conventions ("GPSLatitude", "GPSLatitudeRef", ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifTagSet {
    tags: BTreeMap<String, TagValue>,
}

impl ExifTagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tag.
    pub fn insert(&mut self, name: impl Into<String>, value: TagValue) {
        self.tags.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.tags.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagValue)> {
        self.tags.iter()
    }
}

impl FromIterator<(String, TagValue)> for ExifTagSet {
    fn from_iter<I: IntoIterator<Item = (String, TagValue)>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

/// Signed decimal-degree location.
///
/// Latitude lies in [-90, 90] and longitude in [-180, 180]; south and west
/// are negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinate {
    /// Google Maps link using the full-precision values.
    pub fn map_link(&self) -> String {
        format!(
            "https://maps.google.com/?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// The complete outcome of extracting one file.
///
/// Created fresh per input file and not modified after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Detected container format, if any handler recognized the content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Container fields in the order the container stores them
    pub fields: Vec<MetadataField>,

    /// Decoded GPS location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsCoordinate>,

    /// Non-fatal warnings and informational messages
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

/// How far extraction got for one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Container recognized and walked to the end
    Parsed,
    /// Container recognized but truncated or malformed
    Corrupt,
    /// No handler recognized the content
    Unrecognized,
    /// The input could not be read
    Unreadable,
}

/// A report keyed by the display name of its input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    /// Display name of the input
    pub file_name: String,

    /// Extraction outcome
    pub status: ReportStatus,

    /// Extraction result for that input
    #[serde(flatten)]
    pub report: ExtractionReport,
}

impl FileReport {
    pub fn new(file_name: impl Into<String>, status: ReportStatus, report: ExtractionReport) -> Self {
        Self {
            file_name: file_name.into(),
            status,
            report,
        }
    }
}

/// Counts for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Files whose container was parsed completely
    pub parsed: usize,

    /// Files recognized but truncated or malformed
    pub corrupt: usize,

    /// Files no handler recognized
    pub unrecognized: usize,

    /// Files that could not be read at all
    pub unreadable: usize,

    /// Files with a decoded GPS location
    pub with_gps: usize,
}

impl BatchStats {
    /// Count one finished report.
    pub fn record(&mut self, report: &FileReport) {
        match report.status {
            ReportStatus::Parsed => self.parsed += 1,
            ReportStatus::Corrupt => self.corrupt += 1,
            ReportStatus::Unrecognized => self.unrecognized += 1,
            ReportStatus::Unreadable => self.unreadable += 1,
        }
        if report.report.gps.is_some() {
            self.with_gps += 1;
        }
    }

    /// Total number of reports counted.
    pub fn total(&self) -> usize {
        self.parsed + self.corrupt + self.unrecognized + self.unreadable
    }
}
