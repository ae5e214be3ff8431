//! Probe module for website monitoring.
//!
//! A probe answers one question: did the url respond with 200 in time.

mod http;

pub use http::*;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Reasons a probe counts as unreachable. Only ever logged.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected status {0}")]
    Status(u16),
}

/// Performs a single reachability check.
///
/// Implementations must fold every failure into `false`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> bool;
}

/// Sleep for a random duration in `[0, max)` to spread out a tick's requests.
pub async fn jitter(max: Duration) {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return;
    }
    let delay = rand::random::<u64>() % max_ms;
    tokio::time::sleep(Duration::from_millis(delay)).await;
}
