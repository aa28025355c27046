use crate::{ConversionMode, JobId, Phase};

/// Caller-visible triple emitted at every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobUpdate {
    pub job_id: JobId,
    pub phase: Phase,
    pub percent: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobView {
    pub job_id: Option<JobId>,
    pub mode: Option<ConversionMode>,
    pub phase: Phase,
    pub percent: u8,
    pub message: String,
    pub step: ProcessingStep,
}

/// User-facing processing step derived from progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub enum ProcessingStep {
    #[default]
    Waiting,
    LookingAtDocument,
    FindingTables,
    OrganizingData,
    PreparingSpreadsheet,
    Done,
}

impl ProcessingStep {
    pub fn from_progress(phase: Phase, percent: u8) -> Self {
        match phase {
            Phase::Idle | Phase::Failed => ProcessingStep::Waiting,
            Phase::Completed => ProcessingStep::Done,
            Phase::Submitting | Phase::Streaming => match percent {
                0..=24 => ProcessingStep::LookingAtDocument,
                25..=49 => ProcessingStep::FindingTables,
                50..=74 => ProcessingStep::OrganizingData,
                _ => ProcessingStep::PreparingSpreadsheet,
            },
        }
    }

    /// 1-based position in the step list; 0 while waiting, 5 when done.
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            ProcessingStep::Waiting => "",
            ProcessingStep::LookingAtDocument => "Looking at the document",
            ProcessingStep::FindingTables => "Finding tables",
            ProcessingStep::OrganizingData => "Organizing the data",
            ProcessingStep::PreparingSpreadsheet => "Getting Excel ready",
            ProcessingStep::Done => "Done",
        }
    }
}
