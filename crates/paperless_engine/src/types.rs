use paperless_core::JobError;

/// One parsed progress-channel event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub message: Option<String>,
}

/// Transport-level failure of the progress subscription. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("could not connect: {0}")]
    Connect(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("stream interrupted: {0}")]
    Stream(String),
}

impl From<ChannelError> for JobError {
    fn from(err: ChannelError) -> Self {
        JobError::stream_failure(err)
    }
}
