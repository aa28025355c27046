use async_trait::async_trait;
use paperless_core::{Artifact, ConversionMode, JobError, JobId, SourceFile};
use paperless_logging::{paperless_debug, paperless_info};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

use crate::config::{Clock, ConfigError, ServiceConfig, TransportSettings};
use crate::decode::decode_text;
use crate::filename::resolve_filename;

/// One-shot upload of a job's files; resolves when the artifact is fully received.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    async fn submit(
        &self,
        job_id: &JobId,
        mode: ConversionMode,
        files: &[SourceFile],
    ) -> Result<Artifact, JobError>;
}

/// Shared client for the submission and progress endpoints.
pub fn build_client(settings: &TransportSettings) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .build()
        .map_err(|err| ConfigError::Client(err.to_string()))
}

/// Multipart `POST <base>/<route>?jobId=<id>`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ServiceConfig,
    settings: TransportSettings,
    clock: Clock,
}

impl ReqwestTransport {
    pub fn new(
        config: ServiceConfig,
        settings: TransportSettings,
        clock: Clock,
    ) -> Result<Self, ConfigError> {
        let client = build_client(&settings)?;
        Ok(Self::with_client(client, config, settings, clock))
    }

    pub fn with_client(
        client: reqwest::Client,
        config: ServiceConfig,
        settings: TransportSettings,
        clock: Clock,
    ) -> Self {
        Self {
            client,
            config,
            settings,
            clock,
        }
    }

    fn build_form(&self, files: &[SourceFile]) -> Result<Form, JobError> {
        let mut form = Form::new();
        for file in files {
            let part = Part::stream_with_length(reqwest::Body::from(file.content.clone()), file.size)
                .file_name(file.name.clone())
                .mime_str(guess_mime(&file.name))
                .map_err(JobError::network)?;
            form = form.part(self.settings.field_name.clone(), part);
        }
        Ok(form)
    }

    fn filename_date(&self) -> chrono::NaiveDate {
        (self.clock)().date_naive()
    }
}

#[async_trait]
impl SubmissionTransport for ReqwestTransport {
    async fn submit(
        &self,
        job_id: &JobId,
        mode: ConversionMode,
        files: &[SourceFile],
    ) -> Result<Artifact, JobError> {
        let url = self.config.submit_url(mode.route(), job_id.as_str());
        let form = self.build_form(files)?;
        paperless_info!("submitting {} file(s) for job {job_id} to {url}", files.len());

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        };
        let content_type = header(CONTENT_TYPE);
        let disposition = header(CONTENT_DISPOSITION);

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let err = classify_rejection(status, content_type.as_deref(), &body);
            paperless_debug!("job {job_id} rejected with {status}: {}", err.message);
            return Err(err);
        }

        let payload = response.bytes().await.map_err(map_reqwest_error)?;
        let suggested_filename = resolve_filename(disposition.as_deref(), mode, self.filename_date());
        paperless_debug!(
            "job {job_id} received {} bytes as {suggested_filename}",
            payload.len()
        );
        Ok(Artifact {
            payload,
            suggested_filename,
            content_type: content_type
                .unwrap_or_else(|| mode.output().default_content_type().to_string()),
        })
    }
}

fn guess_mime(name: &str) -> &'static str {
    if name.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

fn map_reqwest_error(err: reqwest::Error) -> JobError {
    if err.is_timeout() {
        return JobError::network(format!("timed out: {err}"));
    }
    if err.is_connect() {
        return JobError::network(format!("connection failed: {err}"));
    }
    JobError::network(err)
}

/// Turns a non-success response into `ServerRejected`, preferring the
/// server's own error text over the bare status line.
pub fn classify_rejection(status: StatusCode, content_type: Option<&str>, body: &[u8]) -> JobError {
    let detail = decode_text(body, content_type)
        .ok()
        .and_then(|decoded| structured_detail(&decoded.text))
        .unwrap_or_else(|| status.to_string());
    JobError::server_rejected(Some(status.as_u16()), detail)
}

fn structured_detail(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text.trim()).ok()?;
    let field = match &value {
        serde_json::Value::Object(map) => ["error", "message", "detail"]
            .iter()
            .find_map(|key| map.get(*key).filter(|v| !v.is_null()))?,
        serde_json::Value::String(_) => &value,
        _ => return None,
    };
    let detail = match field {
        serde_json::Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    };
    (!detail.is_empty()).then_some(detail)
}
