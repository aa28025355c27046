use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use paperless_core::{
    update, validate_submission, Artifact, ConversionMode, Effect, HistoryEntry, InvalidInput,
    JobError, JobId, JobOutcome, JobState, JobUpdate, JobView, Msg, ResetDelay, SessionHistory,
    SourceFile,
};
use paperless_logging::{paperless_debug, paperless_error, paperless_info, paperless_warn};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{
    system_clock, thread_rng_entropy, Clock, ConfigError, ControllerSettings, ServiceConfig,
    TransportSettings,
};
use crate::delivery::{ArtifactDelivery, DownloadDirDelivery};
use crate::ids::JobIdGenerator;
use crate::progress::{ProgressChannel, ProgressStream, SseProgressChannel};
use crate::transport::{build_client, ReqwestTransport, SubmissionTransport};
use crate::types::{ChannelError, ProgressEvent};

/// Receives the caller-visible updates of one job, in emission order.
pub trait JobObserver: Send + Sync {
    fn on_update(&self, update: &JobUpdate);

    /// Called once with the terminal result, unless the job was disposed first.
    fn on_settled(&self, job_id: &JobId, outcome: &JobOutcome) {
        let _ = (job_id, outcome);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error("job {0} is still in flight")]
    Busy(JobId),
    #[error("the controller has been disposed")]
    Disposed,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

/// IO collaborators of the controller.
pub struct JobServices {
    pub transport: Arc<dyn SubmissionTransport>,
    pub channel: Arc<dyn ProgressChannel>,
    pub delivery: Arc<dyn ArtifactDelivery>,
    pub ids: JobIdGenerator,
}

impl JobServices {
    /// Services talking to the remote conversion service and saving into `download_dir`.
    pub fn remote(
        config: ServiceConfig,
        transport: TransportSettings,
        download_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        Self::remote_with_clock(config, transport, download_dir, system_clock())
    }

    pub fn remote_with_clock(
        config: ServiceConfig,
        transport: TransportSettings,
        download_dir: PathBuf,
        clock: Clock,
    ) -> Result<Self, ConfigError> {
        let client = build_client(&transport)?;
        Ok(Self {
            transport: Arc::new(ReqwestTransport::with_client(
                client.clone(),
                config.clone(),
                transport,
                clock.clone(),
            )),
            channel: Arc::new(SseProgressChannel::new(client, config)),
            delivery: Arc::new(DownloadDirDelivery::new(download_dir)),
            ids: JobIdGenerator::new(clock, thread_rng_entropy()),
        })
    }
}

#[derive(Default)]
struct Slot {
    current: Option<JobId>,
    in_flight: bool,
    view: JobView,
    history: SessionHistory,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs conversion jobs one at a time.
///
/// Each job gets a driver task that merges the progress channel, the
/// submission call, the cool-down timer and disposal into one ordered
/// sequence of messages for [`paperless_core::update`].
pub struct JobController {
    services: Arc<JobServices>,
    settings: ControllerSettings,
    slot: Arc<Mutex<Slot>>,
    shutdown: CancellationToken,
    runtime: Handle,
}

impl JobController {
    /// Binds the controller to the current tokio runtime.
    pub fn new(
        services: JobServices,
        settings: ControllerSettings,
    ) -> Result<Self, ControllerError> {
        let runtime =
            Handle::try_current().map_err(|err| ControllerError::NoRuntime(err.to_string()))?;
        Ok(Self::with_runtime(services, settings, runtime))
    }

    pub fn with_runtime(
        services: JobServices,
        settings: ControllerSettings,
        runtime: Handle,
    ) -> Self {
        Self {
            services: Arc::new(services),
            settings,
            slot: Arc::new(Mutex::new(Slot::default())),
            shutdown: CancellationToken::new(),
            runtime,
        }
    }

    /// Starts a job over a frozen copy of `files` and returns without waiting.
    ///
    /// Invalid input is rejected here, before any channel or network activity.
    pub fn start(
        &self,
        files: Vec<SourceFile>,
        mode: ConversionMode,
        observer: Arc<dyn JobObserver>,
    ) -> Result<JobHandle, StartError> {
        validate_submission(&files, mode)?;
        if self.shutdown.is_cancelled() {
            return Err(StartError::Disposed);
        }

        let job_id = {
            let mut slot = lock(&self.slot);
            if let (true, Some(current)) = (slot.in_flight, &slot.current) {
                return Err(StartError::Busy(current.clone()));
            }
            let job_id = self.services.ids.next_id(mode);
            slot.current = Some(job_id.clone());
            slot.in_flight = true;
            job_id
        };
        paperless_info!("starting job {job_id}: {} file(s), {mode}", files.len());

        let dispose = self.shutdown.child_token();
        let (settled_tx, settled_rx) = oneshot::channel();
        let driver = JobDriver {
            job_id: job_id.clone(),
            mode,
            files,
            services: Arc::clone(&self.services),
            settings: self.settings.clone(),
            slot: Arc::clone(&self.slot),
            observer: Some(observer),
            dispose: dispose.clone(),
            settled_tx: Some(settled_tx),
            state: JobState::new(),
            channel: None,
            channel_live: false,
            transport: None,
            reset_at: None,
        };
        self.runtime.spawn(driver.run());

        Ok(JobHandle {
            job_id,
            dispose,
            settled_rx: Some(settled_rx),
            outcome: None,
        })
    }

    /// Snapshot of the current (or most recent) job for rendering.
    pub fn view(&self) -> JobView {
        lock(&self.slot).view.clone()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.slot).in_flight
    }

    pub fn history(&self) -> SessionHistory {
        lock(&self.slot).history.clone()
    }

    /// Disposes every job started by this controller and refuses new ones.
    pub fn dispose(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Caller's handle on one job.
///
/// Dropping it disposes the job, so `let _ = controller.start(..)` cancels
/// the job straight away. Keep the handle until the job has settled.
#[must_use = "dropping a JobHandle disposes the job"]
pub struct JobHandle {
    job_id: JobId,
    dispose: CancellationToken,
    settled_rx: Option<oneshot::Receiver<JobOutcome>>,
    outcome: Option<JobOutcome>,
}

impl JobHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Resolves with the terminal outcome. May be awaited more than once.
    pub async fn settled(&mut self) -> JobOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = match self.settled_rx.as_mut() {
            Some(rx) => rx.await.unwrap_or_else(|_| Err(JobError::cancelled())),
            None => Err(JobError::cancelled()),
        };
        self.settled_rx = None;
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// Closes the progress channel and settles the job as cancelled if it
    /// has not settled yet. The observer receives nothing afterwards.
    pub fn dispose(&self) {
        self.dispose.cancel();
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        self.dispose.cancel();
    }
}

enum Wake {
    Disposed,
    Channel(Option<Result<ProgressEvent, ChannelError>>),
    Transport(JobOutcome),
    Cooldown,
}

struct JobDriver {
    job_id: JobId,
    mode: ConversionMode,
    files: Vec<SourceFile>,
    services: Arc<JobServices>,
    settings: ControllerSettings,
    slot: Arc<Mutex<Slot>>,
    observer: Option<Arc<dyn JobObserver>>,
    dispose: CancellationToken,
    settled_tx: Option<oneshot::Sender<JobOutcome>>,
    state: JobState,
    channel: Option<ProgressStream>,
    /// False once the stream ended or failed; it is not polled again.
    channel_live: bool,
    transport: Option<JoinHandle<JobOutcome>>,
    reset_at: Option<Instant>,
}

impl JobDriver {
    async fn run(mut self) {
        self.apply(Msg::Start {
            job_id: self.job_id.clone(),
            mode: self.mode,
            files: self.files.clone(),
        })
        .await;
        while !self.state.is_finished() {
            let msg = self.next_msg().await;
            self.apply(msg).await;
        }
        self.release_slot();
        paperless_debug!("driver for job {} finished", self.job_id);
    }

    async fn apply(&mut self, msg: Msg) {
        let (state, effects) = update(std::mem::take(&mut self.state), msg);
        self.state = state;
        if self.state.consume_dirty() {
            self.publish_view(self.state.view());
        }
        for effect in effects {
            self.execute(effect).await;
        }
    }

    async fn next_msg(&mut self) -> Msg {
        let wake = tokio::select! {
            biased;
            _ = self.dispose.cancelled(), if !self.state.is_detached() => Wake::Disposed,
            event = next_channel_event(&mut self.channel), if self.channel_live => {
                Wake::Channel(event)
            }
            outcome = join_transport(&mut self.transport), if self.transport.is_some() => {
                Wake::Transport(outcome)
            }
            _ = reset_timer(self.reset_at), if self.reset_at.is_some() => Wake::Cooldown,
            else => Wake::Disposed,
        };

        let job_id = self.job_id.clone();
        match wake {
            Wake::Disposed => {
                paperless_info!("job {job_id} disposed");
                Msg::Disposed { job_id }
            }
            Wake::Channel(Some(Ok(event))) => Msg::ChannelProgress {
                job_id,
                percent: event.percent,
                message: event.message,
            },
            Wake::Channel(Some(Err(err))) => {
                self.channel_live = false;
                paperless_warn!("progress channel for job {job_id} failed: {err}");
                Msg::ChannelEnded {
                    job_id,
                    error: Some(err.into()),
                }
            }
            Wake::Channel(None) => {
                self.channel_live = false;
                paperless_debug!("progress channel for job {job_id} ended");
                Msg::ChannelEnded { job_id, error: None }
            }
            Wake::Transport(outcome) => {
                self.transport = None;
                Msg::TransportSettled { job_id, outcome }
            }
            Wake::Cooldown => {
                self.reset_at = None;
                Msg::CooldownElapsed { job_id }
            }
        }
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Notify(update) => {
                paperless_debug!(
                    "job {} is {:?} at {}%: {}",
                    update.job_id,
                    update.phase,
                    update.percent,
                    update.message
                );
                if let Some(observer) = &self.observer {
                    observer.on_update(&update);
                }
            }
            Effect::OpenChannel { job_id } => {
                self.channel = Some(self.services.channel.open(&job_id));
                self.channel_live = true;
            }
            Effect::Submit {
                job_id,
                mode,
                files,
            } => {
                let transport = Arc::clone(&self.services.transport);
                self.transport = Some(tokio::spawn(async move {
                    transport.submit(&job_id, mode, &files).await
                }));
            }
            Effect::CloseChannel { job_id } => {
                self.channel = None;
                self.channel_live = false;
                paperless_debug!("closed progress channel for job {job_id}");
            }
            Effect::DeliverArtifact { artifact } => {
                let delivery = Arc::clone(&self.services.delivery);
                deliver(delivery, artifact, self.job_id.clone()).await;
            }
            Effect::Settle { job_id, outcome } => self.settle(job_id, outcome),
            Effect::ScheduleReset { delay, .. } => {
                let wait = match delay {
                    ResetDelay::AfterCompletion => self.settings.completion_reset_delay,
                    ResetDelay::AfterFailure => self.settings.failure_reset_delay,
                };
                self.reset_at = Some(Instant::now() + wait);
            }
            Effect::Detach { .. } => self.observer = None,
        }
    }

    fn settle(&mut self, job_id: JobId, outcome: JobOutcome) {
        {
            let mut slot = lock(&self.slot);
            slot.history
                .record(HistoryEntry::new(job_id.clone(), self.mode, &self.files, &outcome));
            if slot.current.as_ref() == Some(&job_id) {
                slot.in_flight = false;
            }
        }
        match &outcome {
            Ok(artifact) => paperless_info!(
                "job {job_id} completed: {} ({} bytes)",
                artifact.suggested_filename,
                artifact.payload.len()
            ),
            Err(err) => paperless_warn!("job {job_id} failed ({}): {}", err.kind, err.message),
        }
        if let Some(observer) = &self.observer {
            observer.on_settled(&job_id, &outcome);
        }
        if let Some(tx) = self.settled_tx.take() {
            let _ = tx.send(outcome);
        }
    }

    fn publish_view(&self, view: JobView) {
        let mut slot = lock(&self.slot);
        if slot.current.as_ref() == Some(&self.job_id) {
            slot.view = view;
        }
    }

    fn release_slot(&self) {
        let mut slot = lock(&self.slot);
        if slot.current.as_ref() == Some(&self.job_id) {
            slot.in_flight = false;
            slot.view = JobView::default();
        }
    }
}

async fn next_channel_event(
    stream: &mut Option<ProgressStream>,
) -> Option<Result<ProgressEvent, ChannelError>> {
    match stream.as_mut() {
        Some(stream) => stream.next().await,
        None => None,
    }
}

async fn join_transport(handle: &mut Option<JoinHandle<JobOutcome>>) -> JobOutcome {
    match handle.as_mut() {
        Some(handle) => handle
            .await
            .unwrap_or_else(|err| Err(JobError::network(format!("upload task failed: {err}")))),
        None => std::future::pending().await,
    }
}

/// Saves off the runtime threads; the job settles once this returns.
async fn deliver(delivery: Arc<dyn ArtifactDelivery>, artifact: Artifact, job_id: JobId) {
    let name = artifact.suggested_filename.clone();
    match tokio::task::spawn_blocking(move || delivery.deliver(&artifact)).await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => paperless_error!("could not save {name} for job {job_id}: {err}"),
        Err(err) => paperless_error!("saving {name} for job {job_id} panicked: {err}"),
    }
}

async fn reset_timer(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
