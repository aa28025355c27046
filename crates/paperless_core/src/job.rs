use std::fmt;
use std::time::SystemTime;

use bytes::Bytes;

/// Opaque, client-generated job identifier. Safe as a URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when every character is an RFC 3986 unreserved character.
    pub fn is_url_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Streaming,
    Completed,
    Failed,
}

impl Phase {
    /// Submission sent and not yet resolved.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Submitting | Phase::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// One staged input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
    pub content: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, modified: SystemTime, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            size: content.len() as u64,
            modified,
            content,
        }
    }
}

/// Binary output of a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub payload: Bytes,
    pub suggested_filename: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobErrorKind {
    NetworkFailure,
    ServerRejected,
    StreamFailure,
    Cancelled,
}

impl fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobErrorKind::NetworkFailure => write!(f, "network failure"),
            JobErrorKind::ServerRejected => write!(f, "server rejected"),
            JobErrorKind::StreamFailure => write!(f, "stream failure"),
            JobErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Failure of a job, carrying the single human-readable message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
    pub server_detail: Option<String>,
    pub status: Option<u16>,
}

impl JobError {
    pub fn network(cause: impl fmt::Display) -> Self {
        Self {
            kind: JobErrorKind::NetworkFailure,
            message: format!("Could not reach the conversion service ({cause})"),
            server_detail: None,
            status: None,
        }
    }

    pub fn server_rejected(status: Option<u16>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            kind: JobErrorKind::ServerRejected,
            message: format!("The conversion failed: {detail}"),
            server_detail: Some(detail),
            status,
        }
    }

    pub fn stream_failure(cause: impl fmt::Display) -> Self {
        Self {
            kind: JobErrorKind::StreamFailure,
            message: format!("Progress updates unavailable ({cause})"),
            server_detail: None,
            status: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: JobErrorKind::Cancelled,
            message: "The conversion was cancelled".to_string(),
            server_detail: None,
            status: None,
        }
    }
}

pub type JobOutcome = Result<Artifact, JobError>;
