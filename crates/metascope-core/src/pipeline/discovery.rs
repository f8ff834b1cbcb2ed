//! Input discovery: expands directories into the files beneath them.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::ProcessingConfig;

/// Discovers input files in directories.
///
/// Content decides the format, so there is no extension filter: every
/// regular file is an input.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes (0 when unknown)
    pub size: u64,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Discover all files at a path.
    ///
    /// A directory is walked recursively and its files returned sorted by
    /// path. Anything else is returned as-is, even when it does not exist,
    /// so the pipeline can report why it could not be read.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if !path.is_dir() {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            return vec![DiscoveredFile {
                path: path.to_path_buf(),
                size,
            }];
        }

        let include_hidden = self.config.include_hidden;
        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .follow_links(self.config.follow_links)
            .into_iter()
            .filter_entry(|e| include_hidden || e.depth() == 0 || !is_hidden(e))
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|entry| DiscoveredFile {
                size: entry.metadata().map(|m| m.len()).unwrap_or(0),
                path: entry.into_path(),
            })
            .collect();

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Discover every input in order, expanding directories in place.
    pub fn discover_all(&self, inputs: &[PathBuf]) -> Vec<DiscoveredFile> {
        inputs.iter().flat_map(|p| self.discover(p)).collect()
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
