//! Report assembly and plain-text rendering.

use std::fmt::Write as _;

use crate::types::{ExtractionReport, FileReport, GpsCoordinate, MetadataField};

/// Informational line used when a file carries no decodable location.
pub const NO_GPS_LINE: &str = "No GPS data found.";

/// Combine the extractor and GPS decoder outputs into one report.
pub fn assemble(
    format: Option<&str>,
    fields: Vec<MetadataField>,
    gps: Option<GpsCoordinate>,
    warnings: Vec<String>,
) -> ExtractionReport {
    ExtractionReport {
        format: format.map(str::to_string),
        fields,
        gps,
        warnings,
    }
}

impl ExtractionReport {
    /// Plain-text rendering: the fields under a "Metadata:" heading, then
    /// the GPS section (or the "no GPS" line), then the warnings.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if !self.fields.is_empty() {
            out.push_str("Metadata:\n");
            for field in &self.fields {
                let _ = writeln!(out, "- {field}");
            }
            out.push('\n');
        }

        match &self.gps {
            Some(coord) => {
                out.push_str("GPS coordinates:\n");
                let _ = writeln!(out, "Latitude: {}", coord.latitude);
                let _ = writeln!(out, "Longitude: {}", coord.longitude);
                let _ = writeln!(out, "Google Maps: {}", coord.map_link());
            }
            None => {
                out.push_str(NO_GPS_LINE);
                out.push('\n');
            }
        }

        for warning in &self.warnings {
            let _ = writeln!(out, "Warning: {warning}");
        }
        out
    }

    /// Whether any warning was recorded.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl FileReport {
    /// Text rendering headed by the file name.
    pub fn to_text(&self) -> String {
        let format = self.report.format.as_deref().unwrap_or("unknown format");
        format!("File: {} ({format})\n\n{}", self.file_name, self.report.to_text())
    }
}
