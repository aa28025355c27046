//! Paperless core: pure conversion-job state machine and view-model helpers.
mod effect;
mod history;
mod job;
mod mode;
mod msg;
mod selection;
mod state;
mod submission;
mod update;
mod view_model;

pub use effect::{Effect, ResetDelay};
pub use history::{HistoryEntry, HistoryResult, SessionHistory};
pub use job::{Artifact, JobError, JobErrorKind, JobId, JobOutcome, Phase, SourceFile};
pub use mode::{ConversionMode, OutputKind};
pub use msg::Msg;
pub use selection::{FileKey, FileSelection};
pub use state::{ChannelState, JobState, ACCEPTED_MESSAGE, ACCEPTED_PERCENT, READY_MESSAGE};
pub use submission::{validate_submission, InvalidInput};
pub use update::update;
pub use view_model::{JobUpdate, JobView, ProcessingStep};
