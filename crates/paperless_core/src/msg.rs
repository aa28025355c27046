use crate::{ConversionMode, JobError, JobId, JobOutcome, SourceFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Caller started a job with a frozen copy of the selection.
    Start {
        job_id: JobId,
        mode: ConversionMode,
        files: Vec<SourceFile>,
    },
    /// Well-formed event from the progress channel.
    ChannelProgress {
        job_id: JobId,
        percent: u8,
        message: Option<String>,
    },
    /// Progress channel ended on the server side or with a stream error. Advisory.
    ChannelEnded {
        job_id: JobId,
        error: Option<JobError>,
    },
    /// The submission call resolved; authoritative for completion.
    TransportSettled { job_id: JobId, outcome: JobOutcome },
    /// Post-settlement cool-down elapsed.
    CooldownElapsed { job_id: JobId },
    /// Caller disposed the job handle (or the whole controller).
    Disposed { job_id: JobId },
}
