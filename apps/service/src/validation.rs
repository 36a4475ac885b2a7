//! Startup validation of monitoring settings.
//!
//! Everything here runs before the first cycle; a failure is a fatal
//! [`ConfigError`].

use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::config::ConfigError;

/// Recommended timeout range; values outside only produce a warning
const RECOMMENDED_MIN_TIMEOUT: u64 = 5;
const RECOMMENDED_MAX_TIMEOUT: u64 = 15;

/// Intervals shorter than this are allowed but noisy for the targets
const RECOMMENDED_MIN_INTERVAL: u64 = 30;

/// Validate an absolute HTTP/HTTPS URL
pub fn validate_http_endpoint(target: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl { url: target.to_string(), reason };

    if target.trim().is_empty() {
        return Err(invalid("URL cannot be empty".into()));
    }

    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return Err(invalid(format!("invalid scheme '{scheme}', must be http or https")));
            }

            if url.host_str().is_none_or(str::is_empty) {
                return Err(invalid("URL must have a valid host".into()));
            }

            Ok(url)
        }
        Err(e) => {
            // If it fails to parse, check if it's missing a scheme
            if !target.contains("://") {
                Err(invalid("URL must include scheme (http:// or https://)".into()))
            } else {
                Err(invalid(e.to_string()))
            }
        }
    }
}

/// Validate the per-check timeout
pub fn validate_timeout(timeout_seconds: u64) -> Result<Duration, ConfigError> {
    if timeout_seconds == 0 {
        return Err(ConfigError::InvalidTimeout(timeout_seconds));
    }

    if !(RECOMMENDED_MIN_TIMEOUT..=RECOMMENDED_MAX_TIMEOUT).contains(&timeout_seconds) {
        warn!(
            timeout_seconds,
            "Timeout outside the recommended range of {}-{} seconds",
            RECOMMENDED_MIN_TIMEOUT,
            RECOMMENDED_MAX_TIMEOUT
        );
    }

    Ok(Duration::from_secs(timeout_seconds))
}

/// Validate the pause between check cycles
pub fn validate_check_interval(interval_seconds: u64) -> Result<Duration, ConfigError> {
    if interval_seconds == 0 {
        return Err(ConfigError::InvalidInterval(interval_seconds));
    }

    if interval_seconds < RECOMMENDED_MIN_INTERVAL {
        warn!(
            interval_seconds,
            "Check interval below the recommended minimum of {} seconds", RECOMMENDED_MIN_INTERVAL
        );
    }

    Ok(Duration::from_secs(interval_seconds))
}
