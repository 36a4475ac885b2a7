use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use url::Url;

/// Sortable timestamp layout used by the console and the durable log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longest connection-error reason kept on a result
const MAX_REASON_LEN: usize = 50;

/// Position of a target in the configured list.
///
/// Duplicate URLs get distinct ids, so they are tracked as independent targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub usize);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single URL under monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    /// URL exactly as configured; results and logs report this
    pub raw: String,
    /// Parsed form used for the request
    pub url: Url,
    /// Per-target override of the global timeout
    pub timeout: Option<Duration>,
}

impl Target {
    pub fn new(id: usize, url: Url) -> Self {
        let raw = url.to_string();
        Self::configured(id, raw, url)
    }

    /// Target keeping the operator's spelling of the URL alongside the parsed form
    pub fn configured(id: usize, raw: impl Into<String>, url: Url) -> Self {
        Self { id: TargetId(id), raw: raw.into(), url, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Timeout to apply to this target given the global default
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }
}

/// Up/down classification of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Up,
    Down,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Up => write!(f, "UP"),
            Outcome::Down => write!(f, "DOWN"),
        }
    }
}

/// What the request attempt produced: a numeric HTTP status or a symbolic failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Code(u16),
    Timeout,
    ConnectionError { reason: String },
}

impl CheckStatus {
    /// Only a plain 200 counts as up
    pub fn outcome(&self) -> Outcome {
        match self {
            CheckStatus::Code(200) => Outcome::Up,
            _ => Outcome::Down,
        }
    }

    /// Rendering used in the durable log's status column
    pub fn log_label(&self) -> Cow<'static, str> {
        match self {
            CheckStatus::Code(code) => Cow::Owned(code.to_string()),
            CheckStatus::Timeout => Cow::Borrowed("TIMEOUT"),
            CheckStatus::ConnectionError { .. } => Cow::Borrowed("ERROR"),
        }
    }

    /// Short failure classification for alerts and diagnostics
    pub fn classification(&self) -> &'static str {
        match self {
            CheckStatus::Code(200) => "ok",
            CheckStatus::Code(_) => "non-success status",
            CheckStatus::Timeout => "timeout",
            CheckStatus::ConnectionError { .. } => "connection error",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Code(code) => write!(f, "{code}"),
            CheckStatus::Timeout => write!(f, "TIMEOUT"),
            CheckStatus::ConnectionError { reason } => write!(f, "ERROR: {reason}"),
        }
    }
}

/// Result of a single check. Created once per target per cycle and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub target_id: TargetId,
    pub url: String,
    /// When the check was started
    pub timestamp: DateTime<Local>,
    pub outcome: Outcome,
    pub status: CheckStatus,
    /// Wall-clock duration of the attempt
    pub latency: Duration,
}

impl CheckResult {
    /// The target answered with `code`
    pub fn responded(target: &Target, timestamp: DateTime<Local>, code: u16, latency: Duration) -> Self {
        Self::build(target, timestamp, CheckStatus::Code(code), latency)
    }

    /// The attempt hit the timeout; latency is pinned to the timeout itself
    pub fn timed_out(target: &Target, timestamp: DateTime<Local>, timeout: Duration) -> Self {
        Self::build(target, timestamp, CheckStatus::Timeout, timeout)
    }

    /// Transport failure (DNS, refused connection, TLS, redirect loop)
    pub fn connection_error(
        target: &Target,
        timestamp: DateTime<Local>,
        reason: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let reason = truncate_reason(reason.into());
        Self::build(target, timestamp, CheckStatus::ConnectionError { reason }, elapsed)
    }

    fn build(target: &Target, timestamp: DateTime<Local>, status: CheckStatus, latency: Duration) -> Self {
        Self {
            target_id: target.id,
            url: target.raw.clone(),
            timestamp,
            outcome: status.outcome(),
            status,
            latency,
        }
    }

    pub fn is_up(&self) -> bool {
        self.outcome == Outcome::Up
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

fn truncate_reason(reason: String) -> String {
    if reason.chars().count() <= MAX_REASON_LEN {
        reason
    } else {
        reason.chars().take(MAX_REASON_LEN).collect()
    }
}
