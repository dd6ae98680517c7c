use std::time::Duration;

use url::Url;

/// Outcome of exactly one liveness probe against one URL.
///
/// `elapsed` is `None` for failed probes (infinite latency).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub url: String,
    pub elapsed: Option<Duration>,
    pub success: bool,
}

impl ProbeResult {
    pub fn reachable(url: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            url: url.into(),
            elapsed: Some(elapsed),
            success: true,
        }
    }

    pub fn unreachable(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            elapsed: None,
            success: false,
        }
    }

    pub fn latency_ms(&self) -> Option<u128> {
        self.elapsed.map(|d| d.as_millis())
    }
}

/// True when `url` parses and uses a scheme a probe can reach over the network.
pub fn has_network_scheme(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return false;
    }
    match Url::parse(trimmed) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https" | "rtmp" | "rtsp")
                && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}
