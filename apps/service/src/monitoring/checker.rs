use std::error::Error as StdError;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::time::timeout;
use tracing::debug;

use super::types::{CheckResult, Target};

/// Redirect hops followed before the attempt is treated as a redirect loop
pub const MAX_REDIRECTS: usize = 10;

/// Checker trait for probing a target
///
/// Implementations never fail: every failure mode is folded into a down
/// [`CheckResult`].
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Perform one bounded-time check against `target`
    async fn check(&self, target: &Target, timeout: Duration) -> CheckResult;
}

/// HTTP/HTTPS checker issuing a single GET per check
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("uptime-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, target: &Target, limit: Duration) -> CheckResult {
        let timestamp = Local::now();
        let start = Instant::now();

        // Whichever bound fires first, the result is a timeout
        let request = self.client.get(target.url.clone()).timeout(limit).send();
        let response = timeout(limit, request).await;
        let elapsed = start.elapsed();

        match response {
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                debug!(url = %target.url, status, latency_ms = elapsed.as_millis() as u64, "Check completed");
                CheckResult::responded(target, timestamp, status, elapsed.min(limit))
            }
            Ok(Err(e)) if e.is_timeout() => {
                debug!(url = %target.url, "Check timed out inside the client");
                CheckResult::timed_out(target, timestamp, limit)
            }
            Ok(Err(e)) => {
                let reason = describe_error(&e);
                debug!(url = %target.url, error = %reason, "Check failed: connection error");
                CheckResult::connection_error(target, timestamp, reason, elapsed)
            }
            Err(_) => {
                debug!(url = %target.url, timeout_ms = limit.as_millis() as u64, "Check timed out");
                CheckResult::timed_out(target, timestamp, limit)
            }
        }
    }
}

/// Classify a transport failure and name its innermost cause
fn describe_error(error: &reqwest::Error) -> String {
    let kind = if error.is_redirect() {
        "redirect loop"
    } else if error.is_connect() {
        "connect"
    } else if error.is_builder() {
        "request"
    } else {
        "transport"
    };

    let mut cause: &dyn StdError = error;
    while let Some(source) = cause.source() {
        cause = source;
    }

    format!("{kind}: {cause}")
}
