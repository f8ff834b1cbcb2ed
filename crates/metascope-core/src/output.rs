//! Report output as plain text, JSON or JSON Lines.
//!
//! Text output concatenates each report's text rendering separated by a
//! blank line. JSON writes a single array for a batch; JSON Lines writes one
//! object per line and never pretty-prints.

use std::io::{self, Write};

use crate::types::FileReport;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable report text
    Text,
    /// Single JSON object or array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// A writer that renders [`FileReport`]s in the chosen format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    include_warnings: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// `pretty` only affects [`OutputFormat::Json`].
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            include_warnings: true,
            items_written: 0,
        }
    }

    /// Drop warning lines from everything written afterwards.
    pub fn with_warnings(mut self, include: bool) -> Self {
        self.include_warnings = include;
        self
    }

    /// Write a single report.
    pub fn write(&mut self, report: &FileReport) -> io::Result<()> {
        let stripped;
        let report = if self.include_warnings {
            report
        } else {
            stripped = Self::without_warnings(report);
            &stripped
        };

        match self.format {
            OutputFormat::Text => {
                if self.items_written > 0 {
                    writeln!(self.writer)?;
                }
                self.writer.write_all(report.to_text().as_bytes())?;
            }
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, report)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, report).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, report).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        self.items_written += 1;
        Ok(())
    }

    /// Write a batch of reports.
    ///
    /// For JSON format, writes a JSON array.
    pub fn write_all(&mut self, reports: &[FileReport]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let owned: Vec<FileReport>;
                let reports = if self.include_warnings {
                    reports
                } else {
                    owned = reports.iter().map(Self::without_warnings).collect();
                    &owned
                };
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, reports)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, reports).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += reports.len();
            }
            OutputFormat::Text | OutputFormat::JsonLines => {
                for report in reports {
                    self.write(report)?;
                }
            }
        }
        Ok(())
    }

    fn without_warnings(report: &FileReport) -> FileReport {
        let mut copy = report.clone();
        copy.report.warnings.clear();
        copy
    }

    /// Get the number of reports written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
