//! Paperless engine: HTTP transport, progress subscription, artifact delivery
//! and the job controller that drives the core state machine.
mod config;
mod controller;
mod decode;
mod delivery;
mod files;
mod filename;
mod ids;
mod persist;
mod progress;
mod sse;
mod transport;
mod types;

pub use config::{
    system_clock, thread_rng_entropy, Clock, ConfigError, ControllerSettings, Entropy,
    ServiceConfig, TransportSettings, API_URL_ENV, DEFAULT_API_URL,
};
pub use controller::{
    ControllerError, JobController, JobHandle, JobObserver, JobServices, StartError,
};
pub use decode::{decode_text, DecodeError, DecodedText};
pub use delivery::{ArtifactDelivery, DeliveryError, DownloadDirDelivery};
pub use files::{load_source_file, FileLoadError};
pub use filename::{
    disk_safe_filename, fallback_filename, filename_from_disposition, resolve_filename,
};
pub use ids::JobIdGenerator;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use progress::{parse_progress_payload, ProgressChannel, ProgressStream, SseProgressChannel};
pub use sse::SseDecoder;
pub use transport::{build_client, classify_rejection, ReqwestTransport, SubmissionTransport};
pub use types::{ChannelError, ProgressEvent};
