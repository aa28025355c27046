use crate::{Artifact, ConversionMode, JobId, JobOutcome, JobUpdate, SourceFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Emit the caller-visible triple.
    Notify(JobUpdate),
    OpenChannel {
        job_id: JobId,
    },
    Submit {
        job_id: JobId,
        mode: ConversionMode,
        files: Vec<SourceFile>,
    },
    /// Release the progress subscription. Emitted at most once per job.
    CloseChannel {
        job_id: JobId,
    },
    DeliverArtifact {
        artifact: Artifact,
    },
    /// Terminal result. Emitted exactly once per job, after `CloseChannel`.
    Settle {
        job_id: JobId,
        outcome: JobOutcome,
    },
    /// Arm the cool-down timer that returns the visible state to idle.
    ScheduleReset {
        job_id: JobId,
        delay: ResetDelay,
    },
    /// Stop calling the observer for this job.
    Detach {
        job_id: JobId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetDelay {
    AfterCompletion,
    AfterFailure,
}
