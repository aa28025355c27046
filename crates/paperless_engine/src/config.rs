use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;

/// Environment variable holding the base address of the conversion service.
pub const API_URL_ENV: &str = "PAPERLESS_API_URL";
pub const DEFAULT_API_URL: &str = "https://convert-pdf-to-excel-1z5e.onrender.com";

/// Injected wall clock.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
/// Injected source of random bits for job ids.
pub type Entropy = Arc<dyn Fn() -> u128 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

pub fn thread_rng_entropy() -> Entropy {
    Arc::new(rand::random::<u128>)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid service url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("failed to build http client: {0}")]
    Client(String),
}

/// Address of the remote conversion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    base_url: Url,
}

impl ServiceConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidUrl {
            url: base_url.to_string(),
            message,
        };
        let mut url = Url::parse(base_url).map_err(|err| invalid(err.to_string()))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) base address".to_string()));
        }
        // Endpoint paths are joined below the base path.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self { base_url: url })
    }

    /// Reads `PAPERLESS_API_URL`, falling back to the hosted service.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(API_URL_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::new(value.trim()),
            _ => Self::new(DEFAULT_API_URL),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST <base>/<route>?jobId=<id>`
    pub fn submit_url(&self, route: &str, job_id: &str) -> Url {
        let mut url = self.endpoint(&[route]);
        url.query_pairs_mut().append_pair("jobId", job_id);
        url
    }

    /// `GET <base>/progress/<id>`
    pub fn progress_url(&self, job_id: &str) -> Url {
        self.endpoint(&["progress", job_id])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    /// Multipart field carrying the files.
    pub field_name: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            field_name: "pdfs".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Time the completed state stays visible before resetting to idle.
    pub completion_reset_delay: Duration,
    pub failure_reset_delay: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            completion_reset_delay: Duration::from_secs(1),
            failure_reset_delay: Duration::from_millis(300),
        }
    }
}
