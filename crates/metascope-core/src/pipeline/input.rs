//! Bounded reading of input files.

use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::config::LimitsConfig;
use crate::error::InputError;
use crate::types::MediaFile;

/// Reads each input once, enforcing the configured size limit.
pub struct InputReader {
    limits: LimitsConfig,
}

impl InputReader {
    /// Create a new reader with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Read `path` into a [`MediaFile`] named after its file name.
    ///
    /// The size is checked against the metadata first and then enforced on
    /// the read itself, so a file that grows in between is still rejected.
    pub async fn read(&self, path: &Path) -> Result<MediaFile, InputError> {
        let unreadable = |e: std::io::Error| InputError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InputError::FileNotFound(path.to_path_buf())
            } else {
                unreadable(e)
            }
        })?;
        if !metadata.is_file() {
            return Err(InputError::Unreadable {
                path: path.to_path_buf(),
                message: "not a regular file".to_string(),
            });
        }

        let max_bytes = self.limits.max_bytes();
        let too_large = |size: u64| InputError::FileTooLarge {
            path: path.to_path_buf(),
            size_mb: size / (1024 * 1024),
            max_mb: self.limits.max_file_size_mb,
        };
        if metadata.len() > max_bytes {
            return Err(too_large(metadata.len()));
        }

        let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
        let mut bytes = Vec::with_capacity(metadata.len() as usize);
        file.take(max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .await
            .map_err(unreadable)?;
        if bytes.len() as u64 > max_bytes {
            return Err(too_large(bytes.len() as u64));
        }

        Ok(MediaFile::new(display_name(path), bytes))
    }
}

/// The name a report is keyed by: the file name, or the whole path when
/// there is none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
