use std::sync::Once;
use std::time::{Duration, SystemTime};

use paperless_core::{
    update, Artifact, ChannelState, ConversionMode, Effect, JobError, JobErrorKind, JobId,
    JobState, JobUpdate, Msg, Phase, ResetDelay, SourceFile, ACCEPTED_MESSAGE, ACCEPTED_PERCENT,
    READY_MESSAGE,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(paperless_logging::initialize_for_tests);
}

fn job_id() -> JobId {
    JobId::new("consignment-18e0-1-00ff")
}

fn file(name: &str) -> SourceFile {
    SourceFile::new(
        name,
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        name.as_bytes().to_vec(),
    )
}

fn artifact() -> Artifact {
    Artifact {
        payload: bytes::Bytes::from_static(b"xlsx-bytes"),
        suggested_filename: "report.xlsx".to_string(),
        content_type: "application/octet-stream".to_string(),
    }
}

fn started() -> (JobState, Vec<Effect>) {
    update(
        JobState::new(),
        Msg::Start {
            job_id: job_id(),
            mode: ConversionMode::General,
            files: vec![file("a.pdf"), file("b.pdf")],
        },
    )
}

fn progress(state: JobState, percent: u8, message: &str) -> (JobState, Vec<Effect>) {
    update(
        state,
        Msg::ChannelProgress {
            job_id: job_id(),
            percent,
            message: Some(message.to_string()),
        },
    )
}

fn notified_percents(effects: &[Effect]) -> Vec<u8> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Notify(update) => Some(update.percent),
            _ => None,
        })
        .collect()
}

fn count_closes(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::CloseChannel { .. }))
        .count()
}

#[test]
fn start_notifies_accepted_then_opens_channel_and_submits() {
    init_logging();
    let (state, effects) = started();

    assert_eq!(state.phase(), Phase::Submitting);
    assert_eq!(state.percent(), ACCEPTED_PERCENT);
    assert_eq!(state.channel(), ChannelState::Open);
    assert_eq!(
        effects,
        vec![
            Effect::Notify(JobUpdate {
                job_id: job_id(),
                phase: Phase::Submitting,
                percent: ACCEPTED_PERCENT,
                message: ACCEPTED_MESSAGE.to_string(),
            }),
            Effect::OpenChannel { job_id: job_id() },
            Effect::Submit {
                job_id: job_id(),
                mode: ConversionMode::General,
                files: vec![file("a.pdf"), file("b.pdf")],
            },
        ]
    );
}

#[test]
fn second_start_on_same_state_is_ignored() {
    init_logging();
    let (state, _) = started();
    let before = state.clone();
    let (next, effects) = update(
        state,
        Msg::Start {
            job_id: JobId::new("other"),
            mode: ConversionMode::Currency,
            files: vec![file("c.pdf")],
        },
    );
    assert_eq!(next, before);
    assert!(effects.is_empty());
}

#[test]
fn first_event_moves_to_streaming() {
    init_logging();
    let (state, _) = started();
    let (state, effects) = progress(state, 10, "Reading page 1");

    assert_eq!(state.phase(), Phase::Streaming);
    assert_eq!(state.message(), "Reading page 1");
    assert_eq!(notified_percents(&effects), vec![10]);
}

#[test]
fn stale_lower_percent_is_discarded() {
    init_logging();
    let (state, _) = started();
    let (state, _) = progress(state, 55, "Finding tables");
    let (state, effects) = progress(state, 30, "Late event");

    assert_eq!(state.percent(), 55);
    assert_eq!(state.message(), "Finding tables");
    assert!(effects.is_empty());
}

#[test]
fn equal_percent_with_new_message_updates_message_only() {
    init_logging();
    let (state, _) = started();
    let (state, _) = progress(state, 55, "Finding tables");
    let (state, effects) = progress(state, 55, "Still finding tables");

    assert_eq!(state.message(), "Still finding tables");
    assert_eq!(notified_percents(&effects), vec![55]);
}

#[test]
fn channel_at_100_does_not_complete_the_job() {
    init_logging();
    let (state, _) = started();
    let (state, effects) = progress(state, 100, "Done on server");

    assert_eq!(state.phase(), Phase::Streaming);
    assert_eq!(state.percent(), 100);
    assert!(!state.is_settled());
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::Settle { .. } | Effect::CloseChannel { .. })));
}

#[test]
fn percent_above_100_is_clamped() {
    init_logging();
    let (state, _) = started();
    let (state, _) = progress(state, 250, "Overshoot");
    assert_eq!(state.percent(), 100);
}

#[test]
fn success_closes_channel_before_settling() {
    init_logging();
    let (state, _) = started();
    let (state, _) = progress(state, 10, "a");
    let (state, _) = progress(state, 55, "b");
    let (state, _) = progress(state, 100, "c");
    let (state, effects) = update(
        state,
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Ok(artifact()),
        },
    );

    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(state.percent(), 100);
    assert_eq!(state.message(), READY_MESSAGE);
    assert_eq!(state.channel(), ChannelState::Closed);
    assert_eq!(
        effects,
        vec![
            Effect::CloseChannel { job_id: job_id() },
            Effect::Notify(JobUpdate {
                job_id: job_id(),
                phase: Phase::Completed,
                percent: 100,
                message: READY_MESSAGE.to_string(),
            }),
            Effect::DeliverArtifact {
                artifact: artifact()
            },
            Effect::Settle {
                job_id: job_id(),
                outcome: Ok(artifact()),
            },
            Effect::ScheduleReset {
                job_id: job_id(),
                delay: ResetDelay::AfterCompletion,
            },
        ]
    );
}

#[test]
fn failure_closes_channel_even_without_100_percent() {
    init_logging();
    let (state, _) = started();
    let (state, _) = progress(state, 40, "working");
    let err = JobError::server_rejected(Some(500), "corrupt pdf");
    let (state, effects) = update(
        state,
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Err(err.clone()),
        },
    );

    assert_eq!(state.phase(), Phase::Failed);
    assert_eq!(state.percent(), 40);
    assert_eq!(count_closes(&effects), 1);
    assert!(effects.contains(&Effect::Settle {
        job_id: job_id(),
        outcome: Err(err),
    }));
    assert!(effects.contains(&Effect::ScheduleReset {
        job_id: job_id(),
        delay: ResetDelay::AfterFailure,
    }));
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::DeliverArtifact { .. })));
}

#[test]
fn transport_may_settle_straight_from_submitting() {
    init_logging();
    let (state, _) = started();
    let (state, effects) = update(
        state,
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Ok(artifact()),
        },
    );
    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(count_closes(&effects), 1);
}

#[test]
fn advisory_stream_end_still_closes_once_at_settlement() {
    init_logging();
    let (state, _) = started();
    let (state, _) = progress(state, 20, "a");
    let (state, effects) = update(
        state,
        Msg::ChannelEnded {
            job_id: job_id(),
            error: Some(JobError::stream_failure("connection reset")),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Streaming);
    assert_eq!(state.channel(), ChannelState::Ended);

    // Events after the stream ended are not applied.
    let (state, effects) = progress(state, 80, "ghost");
    assert!(effects.is_empty());
    assert_eq!(state.percent(), 20);

    let (state, effects) = update(
        state,
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Ok(artifact()),
        },
    );
    assert_eq!(count_closes(&effects), 1);
    assert_eq!(state.channel(), ChannelState::Closed);
}

#[test]
fn terminal_phase_ignores_late_sources() {
    init_logging();
    let (state, _) = started();
    let (state, _) = update(
        state,
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Ok(artifact()),
        },
    );
    let before = state.clone();

    let (state, effects) = progress(state, 100, "late");
    assert!(effects.is_empty());
    let (state, effects) = update(
        state,
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Err(JobError::network("late")),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn messages_for_other_jobs_are_ignored() {
    init_logging();
    let (state, _) = started();
    let before = state.clone();
    let (state, effects) = update(
        state,
        Msg::TransportSettled {
            job_id: JobId::new("someone-else"),
            outcome: Ok(artifact()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn cooldown_resets_visible_state_but_not_phase() {
    init_logging();
    let (state, _) = started();
    let (state, _) = update(
        state,
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Ok(artifact()),
        },
    );
    assert!(!state.is_finished());

    let (state, effects) = update(state, Msg::CooldownElapsed { job_id: job_id() });
    assert_eq!(
        effects,
        vec![Effect::Notify(JobUpdate {
            job_id: job_id(),
            phase: Phase::Idle,
            percent: 0,
            message: String::new(),
        })]
    );
    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(state.view().phase, Phase::Idle);
    assert_eq!(state.view().percent, 0);
    assert!(state.is_finished());

    let (_, effects) = update(state, Msg::CooldownElapsed { job_id: job_id() });
    assert!(effects.is_empty());
}

#[test]
fn cooldown_before_settlement_is_ignored() {
    init_logging();
    let (state, _) = started();
    let (state, effects) = update(state, Msg::CooldownElapsed { job_id: job_id() });
    assert!(effects.is_empty());
    assert_eq!(state.view().phase, Phase::Submitting);
}

#[test]
fn dispose_in_flight_closes_detaches_and_cancels() {
    init_logging();
    let (state, _) = started();
    let (state, _) = progress(state, 30, "a");
    let (state, effects) = update(state, Msg::Disposed { job_id: job_id() });

    assert_eq!(
        effects,
        vec![
            Effect::CloseChannel { job_id: job_id() },
            Effect::Detach { job_id: job_id() },
            Effect::Settle {
                job_id: job_id(),
                outcome: Err(JobError::cancelled()),
            },
        ]
    );
    assert_eq!(state.phase(), Phase::Failed);
    assert!(state.is_finished());

    // The upload still resolves later; its result is dropped.
    let (state, effects) = update(
        state,
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Ok(artifact()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Failed);
}

#[test]
fn dispose_during_cooldown_only_detaches() {
    init_logging();
    let (state, _) = started();
    let (state, _) = update(
        state,
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Err(JobError::network("refused")),
        },
    );
    let (state, effects) = update(state, Msg::Disposed { job_id: job_id() });
    assert_eq!(effects, vec![Effect::Detach { job_id: job_id() }]);
    assert!(state.is_finished());

    let (_, effects) = update(state, Msg::CooldownElapsed { job_id: job_id() });
    assert!(effects.is_empty());
}

#[test]
fn exactly_one_settle_and_close_across_a_noisy_sequence() {
    init_logging();
    let (mut state, mut all) = started();
    let script = vec![
        Msg::ChannelProgress {
            job_id: job_id(),
            percent: 10,
            message: None,
        },
        Msg::ChannelProgress {
            job_id: job_id(),
            percent: 5,
            message: None,
        },
        Msg::ChannelEnded {
            job_id: job_id(),
            error: None,
        },
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Err(JobError::network("reset")),
        },
        Msg::Disposed { job_id: job_id() },
        Msg::TransportSettled {
            job_id: job_id(),
            outcome: Ok(artifact()),
        },
    ];
    for msg in script {
        let (next, effects) = update(state, msg);
        state = next;
        all.extend(effects);
    }

    let settles: Vec<_> = all
        .iter()
        .filter_map(|effect| match effect {
            Effect::Settle { outcome, .. } => Some(outcome.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(settles.len(), 1);
    assert_eq!(
        settles[0].as_ref().unwrap_err().kind,
        JobErrorKind::NetworkFailure
    );
    assert_eq!(count_closes(&all), 1);

    let percents = notified_percents(&all);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
}
