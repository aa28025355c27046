use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use paperless_core::SourceFile;

#[derive(Debug, thiserror::Error)]
pub enum FileLoadError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} is not a regular file")]
    NotAFile(PathBuf),
}

/// Reads a local document into a `SourceFile` named after its last path component.
pub fn load_source_file(path: &Path) -> Result<SourceFile, FileLoadError> {
    let io_err = |source: io::Error| FileLoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let meta = fs::metadata(path).map_err(io_err)?;
    if !meta.is_file() {
        return Err(FileLoadError::NotAFile(path.to_path_buf()));
    }
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| FileLoadError::NotAFile(path.to_path_buf()))?;
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let content = fs::read(path).map_err(io_err)?;
    Ok(SourceFile::new(name, modified, content))
}
