//! Database model types.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Latest known reachability of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unknown,
    Online,
    Offline,
    /// Created but not yet checked.
    Pending,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Online => "online",
            Status::Offline => "offline",
            Status::Pending => "pending",
        }
    }

    /// Status stored for a probe result.
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            Status::Online
        } else {
            Status::Offline
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = std::convert::Infallible;

    /// Unrecognised values read back as `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "online" => Status::Online,
            "offline" => Status::Offline,
            "pending" => Status::Pending,
            _ => Status::Unknown,
        })
    }
}

/// A monitored website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub status: Status,
}

impl Target {
    /// A not-yet-persisted target with a normalized url and `Pending` status.
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            id: 0,
            name: name.trim().to_string(),
            url: normalize_url(url),
            status: Status::Pending,
        }
    }
}

/// Result of a best-effort status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The row was deleted before the write landed.
    NotFound,
}

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^https?://").expect("static regex"))
}

/// Prefix bare hosts with `http://`.
pub fn normalize_url(raw: &str) -> String {
    let url = raw.trim();
    if scheme_re().is_match(url) {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}
