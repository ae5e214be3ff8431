//! Configuration module for SiteWatch.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the API server (default: 5000)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "sitewatch.db")
    pub db_path: String,
    /// Delay between fleet-wide checks (default: 60s)
    pub check_interval: Duration,
    /// Upper bound on a single probe request (default: 10s)
    pub probe_timeout: Duration,
    /// Number of probe workers (default: 10)
    pub max_concurrent_probes: usize,
    /// Capacity of the dispatch queue feeding the workers (default: 1024)
    pub queue_capacity: usize,
    /// Maximum random delay before each probe (default: 100ms)
    pub probe_jitter: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 5000,
            db_path: "sitewatch.db".to_string(),
            check_interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
            max_concurrent_probes: 10,
            queue_capacity: 1024,
            probe_jitter: Duration::from_millis(100),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SITEWATCH_HTTP_PORT`: HTTP port (default: 5000)
    /// - `SITEWATCH_DB_PATH`: Database file path (default: "sitewatch.db")
    /// - `SITEWATCH_CHECK_INTERVAL_SECS`: Seconds between checks (default: 60)
    /// - `SITEWATCH_PROBE_TIMEOUT_SECS`: Probe timeout in seconds (default: 10)
    /// - `SITEWATCH_MAX_CONCURRENT_PROBES`: Probe workers (default: 10)
    /// - `SITEWATCH_QUEUE_CAPACITY`: Dispatch queue size (default: 1024)
    /// - `SITEWATCH_PROBE_JITTER_MS`: Max pre-probe jitter (default: 100)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = parse_var(&lookup, "SITEWATCH_HTTP_PORT") {
            cfg.http_port = port;
        }

        if let Some(db_path) = lookup("SITEWATCH_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "SITEWATCH_CHECK_INTERVAL_SECS") {
            cfg.check_interval = Duration::from_secs(secs.max(1));
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "SITEWATCH_PROBE_TIMEOUT_SECS") {
            cfg.probe_timeout = Duration::from_secs(secs.max(1));
        }

        if let Some(n) = parse_var::<usize, _>(&lookup, "SITEWATCH_MAX_CONCURRENT_PROBES") {
            cfg.max_concurrent_probes = n.max(1);
        }

        if let Some(n) = parse_var::<usize, _>(&lookup, "SITEWATCH_QUEUE_CAPACITY") {
            cfg.queue_capacity = n.max(1);
        }

        if let Some(ms) = parse_var::<u64, _>(&lookup, "SITEWATCH_PROBE_JITTER_MS") {
            cfg.probe_jitter = Duration::from_millis(ms);
        }

        cfg
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value {:?} for {}", raw, key);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.http_port, 5000);
        assert_eq!(cfg.db_path, "sitewatch.db");
        assert_eq!(cfg.check_interval, Duration::from_secs(60));
        assert_eq!(cfg.max_concurrent_probes, 10);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("SITEWATCH_HTTP_PORT", "8081"),
            ("SITEWATCH_DB_PATH", "/tmp/x.db"),
            ("SITEWATCH_CHECK_INTERVAL_SECS", "30"),
            ("SITEWATCH_PROBE_TIMEOUT_SECS", "3"),
            ("SITEWATCH_MAX_CONCURRENT_PROBES", "4"),
            ("SITEWATCH_PROBE_JITTER_MS", "0"),
        ]));
        assert_eq!(cfg.http_port, 8081);
        assert_eq!(cfg.db_path, "/tmp/x.db");
        assert_eq!(cfg.check_interval, Duration::from_secs(30));
        assert_eq!(cfg.probe_timeout, Duration::from_secs(3));
        assert_eq!(cfg.max_concurrent_probes, 4);
        assert_eq!(cfg.probe_jitter, Duration::ZERO);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("SITEWATCH_HTTP_PORT", "not-a-port"),
            ("SITEWATCH_MAX_CONCURRENT_PROBES", "-3"),
        ]));
        assert_eq!(cfg.http_port, 5000);
        assert_eq!(cfg.max_concurrent_probes, 10);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("SITEWATCH_MAX_CONCURRENT_PROBES", "0"),
            ("SITEWATCH_QUEUE_CAPACITY", "0"),
        ]));
        assert_eq!(cfg.max_concurrent_probes, 1);
        assert_eq!(cfg.queue_capacity, 1);
    }
}
