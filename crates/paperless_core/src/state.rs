use crate::view_model::{JobUpdate, JobView, ProcessingStep};
use crate::{ConversionMode, JobId, Phase};

/// Percent reported as soon as the submission is accepted.
pub const ACCEPTED_PERCENT: u8 = 5;
pub const ACCEPTED_MESSAGE: &str = "Request received / upload complete";
pub const READY_MESSAGE: &str = "File ready for download";

/// Lifecycle of the job's progress subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    NotOpened,
    Open,
    /// Server ended the stream; the subscription still has to be released.
    Ended,
    Closed,
}

impl ChannelState {
    pub fn needs_close(self) -> bool {
        matches!(self, ChannelState::Open | ChannelState::Ended)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveJob {
    id: JobId,
    mode: ConversionMode,
}

/// State of exactly one job, from `Idle` to its post-settlement reset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobState {
    job: Option<ActiveJob>,
    phase: Phase,
    percent: u8,
    message: String,
    channel: ChannelState,
    transport_pending: bool,
    settled: bool,
    reset: bool,
    detached: bool,
    dirty: bool,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job.as_ref().map(|job| &job.id)
    }

    pub fn mode(&self) -> Option<ConversionMode> {
        self.job.as_ref().map(|job| job.mode)
    }

    /// Phase of the job itself; never leaves a terminal phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn channel(&self) -> ChannelState {
        self.channel
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Nothing left to drive: settled and either reset or detached.
    pub fn is_finished(&self) -> bool {
        self.settled && (self.reset || self.detached)
    }

    /// Caller-visible state. Shows `Idle` once the cool-down has elapsed.
    pub fn view(&self) -> JobView {
        let (phase, percent, message) = if self.reset {
            (Phase::Idle, 0, String::new())
        } else {
            (self.phase, self.percent, self.message.clone())
        };
        JobView {
            job_id: self.job_id().cloned(),
            mode: self.mode(),
            phase,
            percent,
            message,
            step: ProcessingStep::from_progress(phase, percent),
        }
    }

    /// Returns whether state changed since the last call, then clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    pub(crate) fn matches(&self, job_id: &JobId) -> bool {
        self.job_id() == Some(job_id)
    }

    pub(crate) fn snapshot_update(&self) -> Option<JobUpdate> {
        let view = self.view();
        view.job_id.map(|job_id| JobUpdate {
            job_id,
            phase: view.phase,
            percent: view.percent,
            message: view.message,
        })
    }

    pub(crate) fn begin(&mut self, job_id: JobId, mode: ConversionMode) {
        self.job = Some(ActiveJob { id: job_id, mode });
        self.phase = Phase::Submitting;
        self.percent = ACCEPTED_PERCENT;
        self.message = ACCEPTED_MESSAGE.to_string();
        self.channel = ChannelState::Open;
        self.transport_pending = true;
        self.dirty = true;
    }

    /// Applies a channel event. Returns whether anything visible changed.
    pub(crate) fn apply_progress(&mut self, percent: u8, message: Option<String>) -> bool {
        let mut changed = false;
        if self.phase == Phase::Submitting {
            self.phase = Phase::Streaming;
            changed = true;
        }
        let percent = percent.min(100);
        // A lower percent is a stale or reordered event; drop it whole.
        if percent >= self.percent {
            if percent > self.percent {
                self.percent = percent;
                changed = true;
            }
            if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
                if message != self.message {
                    self.message = message;
                    changed = true;
                }
            }
        }
        if changed {
            self.dirty = true;
        }
        changed
    }

    pub(crate) fn mark_channel_ended(&mut self) {
        if self.channel == ChannelState::Open {
            self.channel = ChannelState::Ended;
        }
    }

    /// Marks the channel closed. Returns `true` only on the first call.
    pub(crate) fn take_channel_close(&mut self) -> bool {
        if self.channel.needs_close() {
            self.channel = ChannelState::Closed;
            true
        } else {
            false
        }
    }

    pub(crate) fn transport_pending(&self) -> bool {
        self.transport_pending
    }

    pub(crate) fn finish_transport(&mut self) {
        self.transport_pending = false;
    }

    pub(crate) fn complete(&mut self, message: &str) {
        self.phase = Phase::Completed;
        self.percent = 100;
        self.message = message.to_string();
        self.settled = true;
        self.dirty = true;
    }

    pub(crate) fn fail(&mut self, message: &str) {
        self.phase = Phase::Failed;
        self.message = message.to_string();
        self.settled = true;
        self.dirty = true;
    }

    pub(crate) fn reset_visible(&mut self) {
        self.reset = true;
        self.dirty = true;
    }

    pub(crate) fn detach(&mut self) {
        self.detached = true;
    }

    pub(crate) fn is_reset(&self) -> bool {
        self.reset
    }
}
