use std::path::PathBuf;

use paperless_core::Artifact;
use paperless_logging::paperless_info;

use crate::filename::disk_safe_filename;
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("suggested filename {0:?} has no usable name")]
    UnusableName(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Hands a finished artifact to the user.
pub trait ArtifactDelivery: Send + Sync {
    fn deliver(&self, artifact: &Artifact) -> Result<PathBuf, DeliveryError>;
}

/// Saves artifacts into a download directory under their suggested name.
pub struct DownloadDirDelivery {
    writer: AtomicFileWriter,
}

impl DownloadDirDelivery {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }
}

impl ArtifactDelivery for DownloadDirDelivery {
    fn deliver(&self, artifact: &Artifact) -> Result<PathBuf, DeliveryError> {
        let name = disk_safe_filename(&artifact.suggested_filename)
            .ok_or_else(|| DeliveryError::UnusableName(artifact.suggested_filename.clone()))?;
        let path = self.writer.write(&name, &artifact.payload)?;
        paperless_info!(
            "saved {} ({} bytes) to {}",
            artifact.suggested_filename,
            artifact.payload.len(),
            path.display()
        );
        Ok(path)
    }
}
