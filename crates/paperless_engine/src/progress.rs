use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use paperless_core::JobId;
use paperless_logging::{paperless_debug, paperless_warn};
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::config::ServiceConfig;
use crate::sse::SseDecoder;
use crate::types::{ChannelError, ProgressEvent};

/// Ordered progress events for one job. Dropping the stream closes the subscription.
pub type ProgressStream = BoxStream<'static, Result<ProgressEvent, ChannelError>>;

/// Per-job server-push progress subscription.
///
/// `open` must not block; the connection is made when the stream is first polled.
/// A stream that ends or yields an error is finished and is not polled again.
pub trait ProgressChannel: Send + Sync {
    fn open(&self, job_id: &JobId) -> ProgressStream;
}

#[derive(Debug, Deserialize)]
struct ProgressPayload {
    progress: f64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Parses one event payload `{"progress": <0-100>, "status": <text>?}`.
///
/// A `message` key is used when `status` is missing or blank. Returns `None` for malformed payloads; out-of-range percentages are clamped.
pub fn parse_progress_payload(data: &str) -> Option<ProgressEvent> {
    let payload: ProgressPayload = serde_json::from_str(data).ok()?;
    if !payload.progress.is_finite() {
        return None;
    }
    let percent = payload.progress.round().clamp(0.0, 100.0) as u8;
    let message = [payload.status, payload.message]
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty());
    Some(ProgressEvent { percent, message })
}

/// Server-sent-events subscription to `GET <base>/progress/<id>`.
#[derive(Clone)]
pub struct SseProgressChannel {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl SseProgressChannel {
    pub fn new(client: reqwest::Client, config: ServiceConfig) -> Self {
        Self { client, config }
    }
}

enum SseState {
    Connecting(reqwest::RequestBuilder),
    Reading {
        body: BoxStream<'static, reqwest::Result<Bytes>>,
        decoder: SseDecoder,
        pending: VecDeque<ProgressEvent>,
    },
    Done,
}

impl ProgressChannel for SseProgressChannel {
    fn open(&self, job_id: &JobId) -> ProgressStream {
        let request = self
            .client
            .get(self.config.progress_url(job_id.as_str()))
            .header(ACCEPT, "text/event-stream");
        let job_id = job_id.clone();
        stream::unfold(SseState::Connecting(request), move |state| {
            let job_id = job_id.clone();
            async move { next_event(state, &job_id).await }
        })
        .boxed()
    }
}

async fn next_event(
    mut state: SseState,
    job_id: &JobId,
) -> Option<(Result<ProgressEvent, ChannelError>, SseState)> {
    loop {
        state = match state {
            SseState::Done => return None,
            SseState::Connecting(request) => match request.send().await {
                Err(err) => return Some((Err(ChannelError::Connect(err.to_string())), SseState::Done)),
                Ok(response) if !response.status().is_success() => {
                    let status = response.status().as_u16();
                    return Some((Err(ChannelError::HttpStatus(status)), SseState::Done));
                }
                Ok(response) => {
                    paperless_debug!("progress channel for job {job_id} connected");
                    SseState::Reading {
                        body: response.bytes_stream().boxed(),
                        decoder: SseDecoder::new(),
                        pending: VecDeque::new(),
                    }
                }
            },
            SseState::Reading {
                mut body,
                mut decoder,
                mut pending,
            } => {
                if let Some(event) = pending.pop_front() {
                    return Some((
                        Ok(event),
                        SseState::Reading {
                            body,
                            decoder,
                            pending,
                        },
                    ));
                }
                match body.next().await {
                    None => return None,
                    Some(Err(err)) => {
                        return Some((Err(ChannelError::Stream(err.to_string())), SseState::Done))
                    }
                    Some(Ok(chunk)) => {
                        for data in decoder.feed(&chunk) {
                            match parse_progress_payload(&data) {
                                Some(event) => pending.push_back(event),
                                None => paperless_warn!(
                                    "dropping malformed progress event for job {job_id}: {data:?}"
                                ),
                            }
                        }
                        SseState::Reading {
                            body,
                            decoder,
                            pending,
                        }
                    }
                }
            }
        };
    }
}
