use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::net::TcpStream;
use tvsource_core::{has_network_scheme, ProbeResult};
use url::Url;

use engine_logging::engine_debug;

use crate::fetch::map_reqwest_error;
use crate::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub head_timeout: Duration,
    pub get_timeout: Duration,
    /// Bytes read by the GET fallback before the transfer is dropped.
    pub prefix_bytes: usize,
    pub rtmp_port: u16,
    pub rtsp_port: u16,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            head_timeout: Duration::from_secs(5),
            get_timeout: Duration::from_secs(8),
            prefix_bytes: 1024,
            rtmp_port: 1935,
            rtsp_port: 554,
        }
    }
}

#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// One liveness check. Failures are results, never errors.
    async fn probe(&self, url: &str) -> ProbeResult;
}

/// HEAD first, streaming partial GET as fallback; TCP connect for rtmp/rtsp.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    settings: ProbeSettings,
}

impl HttpProber {
    pub fn new(client: reqwest::Client, settings: ProbeSettings) -> Self {
        Self { client, settings }
    }

    /// Latency of a successful check, or why it failed.
    pub async fn check(&self, url: &str) -> Result<Duration, FetchError> {
        if !has_network_scheme(url) {
            return Err(FetchError::new(FailureKind::UnsupportedScheme, url));
        }
        let parsed = Url::parse(url.trim())
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        match parsed.scheme() {
            "rtmp" => self.connect(&parsed, self.settings.rtmp_port).await,
            "rtsp" => self.connect(&parsed, self.settings.rtsp_port).await,
            _ => match self.head(&parsed).await {
                Ok(elapsed) => Ok(elapsed),
                Err(err) => {
                    engine_debug!("HEAD {} failed ({}), trying partial GET", url, err);
                    self.partial_get(&parsed).await
                }
            },
        }
    }

    async fn head(&self, url: &Url) -> Result<Duration, FetchError> {
        let start = Instant::now();
        let response = self
            .client
            .head(url.clone())
            .timeout(self.settings.head_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if is_success_status(status) {
            Ok(start.elapsed())
        } else {
            Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ))
        }
    }

    async fn partial_get(&self, url: &Url) -> Result<Duration, FetchError> {
        let start = Instant::now();
        let read = async {
            let response = self
                .client
                .get(url.clone())
                .timeout(self.settings.get_timeout)
                .send()
                .await
                .map_err(map_reqwest_error)?;
            let status = response.status();
            if !is_success_status(status) {
                return Err(FetchError::new(
                    FailureKind::HttpStatus(status.as_u16()),
                    status.to_string(),
                ));
            }

            let mut received = 0usize;
            let mut stream = response.bytes_stream();
            while received < self.settings.prefix_bytes.max(1) {
                match stream.next().await {
                    Some(chunk) => received += chunk.map_err(map_reqwest_error)?.len(),
                    None => break,
                }
            }
            // Dropping the stream here aborts the rest of the transfer.
            if received == 0 {
                return Err(FetchError::new(FailureKind::EmptyBody, "no payload bytes"));
            }
            Ok::<usize, FetchError>(received)
        };

        match tokio::time::timeout(self.settings.get_timeout, read).await {
            Ok(Ok(_)) => Ok(start.elapsed()),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(FetchError::new(FailureKind::Timeout, "partial read timed out")),
        }
    }

    async fn connect(&self, url: &Url, default_port: u16) -> Result<Duration, FetchError> {
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::new(FailureKind::InvalidUrl, "missing host"))?;
        let port = url.port().unwrap_or(default_port);
        let start = Instant::now();
        match tokio::time::timeout(self.settings.head_timeout, TcpStream::connect((host, port)))
            .await
        {
            Ok(Ok(_stream)) => Ok(start.elapsed()),
            Ok(Err(err)) => Err(FetchError::new(FailureKind::Network, err.to_string())),
            Err(_) => Err(FetchError::new(FailureKind::Timeout, "connect timed out")),
        }
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeResult {
        match self.check(url).await {
            Ok(elapsed) => ProbeResult::reachable(url, elapsed),
            Err(err) => {
                engine_debug!("probe {} failed: {}", url, err);
                ProbeResult::unreachable(url)
            }
        }
    }
}

fn is_success_status(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::PARTIAL_CONTENT
}
