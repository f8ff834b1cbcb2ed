//! Zip packaging of per-file text reports.
//!
//! Each report becomes one `{name}_metadata.txt` entry. Names are made safe
//! for extraction on any platform and de-duplicated with a numeric suffix.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;
use crate::types::FileReport;

const ENTRY_SUFFIX: &str = "_metadata.txt";

/// Writes report archives.
pub struct ArchiveExporter;

impl ArchiveExporter {
    /// Entry names for `reports`, in order.
    pub fn entry_names(reports: &[FileReport]) -> Vec<String> {
        let mut used = HashSet::new();
        reports
            .iter()
            .map(|report| {
                let base = sanitize(&report.file_name);
                let mut name = format!("{base}{ENTRY_SUFFIX}");
                let mut n = 2;
                while !used.insert(name.clone()) {
                    name = format!("{base}_{n}{ENTRY_SUFFIX}");
                    n += 1;
                }
                name
            })
            .collect()
    }

    /// Write the archive into `writer` and return it.
    pub fn write<W: Write + Seek>(writer: W, reports: &[FileReport]) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (name, report) in Self::entry_names(reports).into_iter().zip(reports) {
            tracing::trace!("Adding {} to archive", name);
            zip.start_file(name, options)?;
            zip.write_all(report.to_text().as_bytes())?;
        }
        Ok(zip.finish()?)
    }

    /// Write the archive to `path`, replacing any existing file.
    pub fn write_to_path(path: &Path, reports: &[FileReport]) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = Self::write(BufWriter::new(file), reports)?;
        writer.flush()?;
        tracing::info!("Exported {} reports to {:?}", reports.len(), path);
        Ok(())
    }
}

/// Make a display name safe as a flat archive entry name.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_start_matches(['.', ' ']).trim_end();
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
