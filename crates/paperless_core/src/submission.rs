use crate::{ConversionMode, SourceFile};

/// Rejection raised before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("no files selected")]
    EmptySelection,
    #[error("{mode} accepts at most {max} file(s), got {actual}")]
    TooManyFiles {
        mode: ConversionMode,
        max: usize,
        actual: usize,
    },
}

pub fn validate_submission(files: &[SourceFile], mode: ConversionMode) -> Result<(), InvalidInput> {
    if files.is_empty() {
        return Err(InvalidInput::EmptySelection);
    }
    if let Some(max) = mode.max_files() {
        if files.len() > max {
            return Err(InvalidInput::TooManyFiles {
                mode,
                max,
                actual: files.len(),
            });
        }
    }
    Ok(())
}
