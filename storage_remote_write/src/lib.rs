//! # Storage Backend: Remote Write
//!
//! Pushes speedtest metrics using the Prometheus remote write protocol.
//!
//! A push is a single snappy-compressed protobuf `WriteRequest`, sent as one
//! authenticated `POST`; nothing is retried.

pub mod proto;

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use log::debug;
use prost::Message;
use surf::http::headers::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE, USER_AGENT};
use thiserror::Error;
use url::Url;

use speedtest_core::{Label, Metrics};

/// The `User-Agent` sent with each write
pub const USER_AGENT_VALUE: &str = concat!("speedtest-to-prom/", env!("CARGO_PKG_VERSION"));
pub const REMOTE_WRITE_VERSION: &str = "0.1.0";
pub const HEADER_REMOTE_WRITE_VERSION: &str = "X-Prometheus-Remote-Write-Version";
pub const METRIC_NAME_LABEL: &str = "__name__";

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to encode write request: {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("failed to compress write request body: {0}")]
    Compress(#[from] snap::Error),
    #[error("invalid remote write url '{url}': {source}")]
    InvalidUrl { url: String, source: url::ParseError },
    #[error("failed to send request: {0}")]
    Failed(surf::Error),
    #[error("remote write timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
}

/// Basic auth credentials for the remote write endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The `Authorization` header value
    pub fn authorization(&self) -> String {
        let token = BASE64.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {}", token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Build a WriteRequest with one single-sample series per metric value.
///
/// Each series is labeled with the static labels, then `__name__`, then the
/// value's own labels. Duplicate label names are not removed.
pub fn build_write_request(
    timestamp: i64,
    metrics: &Metrics,
    static_labels: &[Label],
) -> proto::WriteRequest {
    let mut timeseries = Vec::new();
    for (metric_name, values) in metrics {
        for metric in values {
            let mut labels = Vec::with_capacity(static_labels.len() + 1 + metric.labels.len());
            for (name, value) in static_labels {
                labels.push(proto::Label {
                    name: name.clone(),
                    value: value.clone(),
                });
            }
            labels.push(proto::Label {
                name: METRIC_NAME_LABEL.into(),
                value: metric_name.clone(),
            });
            for (name, value) in &metric.labels {
                labels.push(proto::Label {
                    name: name.clone(),
                    value: value.clone(),
                });
            }
            let samples = vec![proto::Sample {
                value: metric.value,
                timestamp,
            }];
            timeseries.push(proto::TimeSeries { labels, samples });
        }
    }
    proto::WriteRequest { timeseries }
}

/// Serialize a request and compress it with snappy (block format, not framed)
pub fn encode_write_request(request: &proto::WriteRequest) -> Result<Vec<u8>, WriteError> {
    let mut bytes: Vec<u8> = Vec::with_capacity(request.encoded_len());
    request.encode(&mut bytes)?;

    let mut encoder = snap::raw::Encoder::new();
    Ok(encoder.compress_vec(&bytes)?)
}

/// Only 200 and 204 are accepted; every other status fails the write.
///
/// The HTTP client only decodes registered status codes. A response with an
/// unregistered code (e.g. 520 or 599) fails while decoding and is reported as
/// `WriteError::Failed`, without the code.
pub fn check_status(status: u16) -> Result<(), WriteError> {
    match status {
        200 | 204 => Ok(()),
        _ => Err(WriteError::UnexpectedStatus(status)),
    }
}

#[derive(Clone, Debug)]
pub struct RemoteWriteClient {
    write_url: String,
    credentials: Credentials,

    /// How long to wait for the endpoint to respond; surf's client default (60s) applies if unset
    timeout: Option<Duration>,
}

impl RemoteWriteClient {
    pub fn new(write_url: impl Into<String>, credentials: Credentials) -> Self {
        RemoteWriteClient {
            write_url: write_url.into(),
            credentials,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Write every metric in a single request, returning the number of series sent
    pub async fn write(
        &self,
        metrics: &Metrics,
        static_labels: &[Label],
    ) -> Result<usize, WriteError> {
        let url = Url::parse(&self.write_url).map_err(|source| WriteError::InvalidUrl {
            url: self.write_url.clone(),
            source,
        })?;

        // Every sample in a push shares the same timestamp
        let timestamp = Utc::now().timestamp_millis();
        let request = build_write_request(timestamp, metrics, static_labels);
        let out = request.timeseries.len();
        let body = encode_write_request(&request)?;
        debug!(
            "writing {} series ({} bytes compressed) to {}",
            out,
            body.len(),
            url.host_str().unwrap_or_default()
        );

        let status = match self.timeout {
            Some(timeout) => async_std::future::timeout(timeout, self.send(url, body))
                .await
                .map_err(|_| WriteError::Timeout(timeout))??,
            None => self.send(url, body).await?,
        };
        check_status(status)?;

        Ok(out)
    }

    async fn send(&self, url: Url, body: Vec<u8>) -> Result<u16, WriteError> {
        let authorization = self.credentials.authorization();
        let response = surf::post(url)
            .body_bytes(body)
            .header(CONTENT_ENCODING, "snappy")
            .header(CONTENT_TYPE, "application/x-protobuf")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(HEADER_REMOTE_WRITE_VERSION, REMOTE_WRITE_VERSION)
            .header(AUTHORIZATION, authorization.as_str())
            .await
            .map_err(WriteError::Failed)?;
        Ok(response.status() as u16)
    }
}
