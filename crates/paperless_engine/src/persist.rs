use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;
use thiserror::Error;

/// Prefix of in-progress downloads, so they sort apart and stay hidden on unix.
const PARTIAL_PREFIX: &str = ".paperless-partial-";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("download directory {path} is unusable: {reason}")]
    DownloadDir { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates the download directory if needed and checks that it is a directory.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |reason: String| PersistError::DownloadDir {
        path: dir.to_path_buf(),
        reason,
    };
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(unusable("not a directory".to_string())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| unusable(e.to_string()))
        }
        Err(err) => Err(unusable(err.to_string())),
    }
}

/// Writes `{dir}/{filename}` through a temp file in the same directory, so a
/// partially written artifact never appears under its final name.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Returns the final path. An existing file of the same name is replaced.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let mut partial = Builder::new().prefix(PARTIAL_PREFIX).tempfile_in(&self.dir)?;
        partial.write_all(content)?;
        partial.as_file_mut().sync_all()?;

        let target = self.dir.join(filename);
        if target.is_file() {
            fs::remove_file(&target)?;
        }
        partial.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
