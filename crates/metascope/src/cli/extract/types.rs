//! CLI enum types for the extract command.

use clap::ValueEnum;
use metascope_core::OutputFormat as CoreOutputFormat;

/// Report formats accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text blocks
    Text,
    /// Single JSON object or array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl ReportFormat {
    /// Resolve the effective format: the flag if given, else the config
    /// value, else text.
    pub fn resolve(flag: Option<Self>, configured: &str) -> Self {
        flag.unwrap_or_else(|| match CoreOutputFormat::parse(configured) {
            Some(CoreOutputFormat::Json) => Self::Json,
            Some(CoreOutputFormat::JsonLines) => Self::Jsonl,
            _ => Self::Text,
        })
    }
}

impl From<ReportFormat> for CoreOutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Text => CoreOutputFormat::Text,
            ReportFormat::Json => CoreOutputFormat::Json,
            ReportFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}
