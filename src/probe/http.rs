//! HTTP probe implementation.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::{Duration, Instant};

use super::{jitter, ProbeError, Prober};

/// GET-based prober sharing one connection pool across all probes.
#[derive(Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
    jitter: Duration,
}

impl HttpProber {
    pub fn new(timeout: Duration, jitter: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sitewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
            jitter,
        })
    }

    /// Issue the request and return the latency of a 200 response.
    pub async fn check(&self, url: &str) -> Result<Duration, ProbeError> {
        let start = Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.timeout)
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

        if response.status() != StatusCode::OK {
            return Err(ProbeError::Status(response.status().as_u16()));
        }

        Ok(start.elapsed())
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> bool {
        jitter(self.jitter).await;

        match self.check(url).await {
            Ok(latency) => {
                tracing::debug!(%url, latency_ms = latency.as_millis() as u64, "probe ok");
                true
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "probe failed");
                false
            }
        }
    }
}
