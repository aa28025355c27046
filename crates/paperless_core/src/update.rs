use crate::state::READY_MESSAGE;
use crate::{ChannelState, Effect, JobError, JobId, JobState, Msg, ResetDelay};

/// Pure update function: applies a message to state and returns any effects.
///
/// Two sources feed one job: the progress channel and the submission call.
/// Only `TransportSettled` (or `Disposed`) moves the phase to a terminal
/// value; a channel reporting 100% keeps the job in `Streaming`.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start {
            job_id,
            mode,
            files,
        } => {
            // One state drives one job; a second start is ignored.
            if state.job_id().is_some() {
                return (state, Vec::new());
            }
            state.begin(job_id.clone(), mode);
            let mut effects = Vec::with_capacity(3);
            effects.extend(notify(&state));
            effects.push(Effect::OpenChannel {
                job_id: job_id.clone(),
            });
            effects.push(Effect::Submit {
                job_id,
                mode,
                files,
            });
            effects
        }
        Msg::ChannelProgress {
            job_id,
            percent,
            message,
        } => {
            if !state.matches(&job_id)
                || !state.phase().is_active()
                || state.channel() != ChannelState::Open
            {
                return (state, Vec::new());
            }
            if state.apply_progress(percent, message) {
                notify(&state).into_iter().collect()
            } else {
                Vec::new()
            }
        }
        Msg::ChannelEnded { job_id, error: _ } => {
            // Advisory: the submission call stays authoritative.
            if state.matches(&job_id) {
                state.mark_channel_ended();
            }
            Vec::new()
        }
        Msg::TransportSettled { job_id, outcome } => {
            if !state.matches(&job_id) || !state.transport_pending() {
                return (state, Vec::new());
            }
            state.finish_transport();
            // Disposed jobs already settled as cancelled; the late result is dropped.
            if state.is_settled() {
                return (state, Vec::new());
            }
            let mut effects = Vec::with_capacity(5);
            effects.extend(close_channel(&mut state, &job_id));
            match outcome {
                Ok(artifact) => {
                    state.complete(READY_MESSAGE);
                    effects.extend(notify(&state));
                    effects.push(Effect::DeliverArtifact {
                        artifact: artifact.clone(),
                    });
                    effects.push(Effect::Settle {
                        job_id: job_id.clone(),
                        outcome: Ok(artifact),
                    });
                    effects.push(Effect::ScheduleReset {
                        job_id,
                        delay: ResetDelay::AfterCompletion,
                    });
                }
                Err(err) => {
                    state.fail(&err.message);
                    effects.extend(notify(&state));
                    effects.push(Effect::Settle {
                        job_id: job_id.clone(),
                        outcome: Err(err),
                    });
                    effects.push(Effect::ScheduleReset {
                        job_id,
                        delay: ResetDelay::AfterFailure,
                    });
                }
            }
            effects
        }
        Msg::CooldownElapsed { job_id } => {
            if !state.matches(&job_id)
                || !state.is_settled()
                || state.is_reset()
                || state.is_detached()
            {
                return (state, Vec::new());
            }
            state.reset_visible();
            notify(&state).into_iter().collect()
        }
        Msg::Disposed { job_id } => {
            if !state.matches(&job_id) || state.is_detached() {
                return (state, Vec::new());
            }
            let mut effects = Vec::with_capacity(3);
            effects.extend(close_channel(&mut state, &job_id));
            state.detach();
            effects.push(Effect::Detach {
                job_id: job_id.clone(),
            });
            if !state.is_settled() {
                let err = JobError::cancelled();
                state.fail(&err.message);
                effects.push(Effect::Settle {
                    job_id,
                    outcome: Err(err),
                });
            }
            effects
        }
    };

    (state, effects)
}

fn notify(state: &JobState) -> Option<Effect> {
    state.snapshot_update().map(Effect::Notify)
}

fn close_channel(state: &mut JobState, job_id: &JobId) -> Option<Effect> {
    state.take_channel_close().then(|| Effect::CloseChannel {
        job_id: job_id.clone(),
    })
}
