//! Alert decisions and delivery.
//!
//! Alerts fire on transition edges only, so a target that stays down produces a
//! single alert per down period. Delivery failures are logged and never retried
//! within the same cycle.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, info};

use super::state::Transition;
use super::types::{CheckResult, CheckStatus, TIMESTAMP_FORMAT, Target};

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("could not build alert message: {0}")]
    Build(String),
    #[error("alert transport rejected delivery: {0}")]
    Transport(String),
    #[error("alert delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Kind of notification derived from an alertable transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Down,
    Recovered,
    FirstDown,
    FirstUp,
}

impl AlertKind {
    pub fn from_transition(transition: Transition) -> Option<Self> {
        match transition {
            Transition::WentDown => Some(AlertKind::Down),
            Transition::WentUp => Some(AlertKind::Recovered),
            Transition::FirstObservationDown => Some(AlertKind::FirstDown),
            Transition::FirstObservationUp => Some(AlertKind::FirstUp),
            Transition::None => None,
        }
    }

    fn headline(self) -> &'static str {
        match self {
            AlertKind::Down | AlertKind::FirstDown => "is DOWN",
            AlertKind::Recovered => "is back UP",
            AlertKind::FirstUp => "is UP",
        }
    }
}

/// Outbound notification payload
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub url: String,
    pub status: CheckStatus,
    pub timestamp: DateTime<Local>,
    pub latency: Duration,
}

impl Alert {
    pub fn new(kind: AlertKind, result: &CheckResult) -> Self {
        Self {
            kind,
            url: result.url.clone(),
            status: result.status.clone(),
            timestamp: result.timestamp,
            latency: result.latency,
        }
    }

    pub fn subject(&self) -> String {
        match self.kind {
            AlertKind::Down | AlertKind::FirstDown => format!("🚨 ALERT: {} {}", self.url, self.kind.headline()),
            AlertKind::Recovered | AlertKind::FirstUp => format!("✅ RESOLVED: {} {}", self.url, self.kind.headline()),
        }
    }

    pub fn body(&self) -> String {
        let title = match self.kind {
            AlertKind::Down | AlertKind::FirstDown => "Website Downtime Alert",
            AlertKind::Recovered | AlertKind::FirstUp => "Website Recovery Notice",
        };

        format!(
            "{title}\n\n\
             URL: {url}\n\
             Status: {headline}\n\
             Failure: {classification}\n\
             Status Code: {status}\n\
             Response Time: {latency:.2}ms\n\
             Timestamp: {timestamp}\n\n\
             This is an automated alert from your uptime monitor.\n",
            url = self.url,
            headline = self.kind.headline(),
            classification = self.status.classification(),
            status = self.status,
            latency = self.latency.as_secs_f64() * 1000.0,
            timestamp = self.timestamp.format(TIMESTAMP_FORMAT),
        )
    }
}

/// Sink an [`AlertDispatcher`] writes notifications to
#[async_trait::async_trait]
pub trait AlertTransport: Send + Sync {
    /// Short transport name for logs
    fn name(&self) -> &str;

    async fn deliver(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Set of transitions that trigger a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPolicy {
    alertable: BTreeSet<Transition>,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::new([Transition::WentDown])
    }
}

impl AlertPolicy {
    /// `Transition::None` is dropped; it can never alert
    pub fn new(transitions: impl IntoIterator<Item = Transition>) -> Self {
        let alertable = transitions.into_iter().filter(|t| *t != Transition::None).collect();
        Self { alertable }
    }

    /// Also alert when a target comes back up
    pub fn with_recovery(mut self) -> Self {
        self.alertable.insert(Transition::WentUp);
        self
    }

    /// Also alert when the first check of a target is down
    pub fn with_first_failure(mut self) -> Self {
        self.alertable.insert(Transition::FirstObservationDown);
        self
    }

    pub fn is_alertable(&self, transition: Transition) -> bool {
        self.alertable.contains(&transition)
    }

    pub fn transitions(&self) -> impl Iterator<Item = Transition> + '_ {
        self.alertable.iter().copied()
    }
}

/// What [`AlertDispatcher::maybe_alert`] did
#[derive(Debug)]
pub enum Dispatch {
    /// Transition not in the alertable set
    NotAlertable,
    /// Alert condition met but no transport is configured
    NoTransport(Alert),
    Delivered(Alert),
    Failed { alert: Alert, error: AlertError },
}

impl Dispatch {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Dispatch::Delivered(_))
    }
}

/// Decides whether a transition warrants a notification and sends it
pub struct AlertDispatcher {
    policy: AlertPolicy,
    transport: Option<Arc<dyn AlertTransport>>,
    delivery_timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(
        policy: AlertPolicy,
        transport: Option<Arc<dyn AlertTransport>>,
        delivery_timeout: Duration,
    ) -> Self {
        Self { policy, transport, delivery_timeout }
    }

    /// Dispatcher without a transport; alert conditions are only logged
    pub fn disabled(policy: AlertPolicy) -> Self {
        Self::new(policy, None, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    pub async fn maybe_alert(&self, target: &Target, result: &CheckResult, transition: Transition) -> Dispatch {
        if !self.policy.is_alertable(transition) {
            return Dispatch::NotAlertable;
        }
        let Some(kind) = AlertKind::from_transition(transition) else {
            return Dispatch::NotAlertable;
        };
        let alert = Alert::new(kind, result);

        let Some(transport) = &self.transport else {
            info!(
                url = %target.url,
                %transition,
                status = %result.status,
                "Alert condition met but alerting is not configured"
            );
            return Dispatch::NoTransport(alert);
        };

        let delivery = match timeout(self.delivery_timeout, transport.deliver(&alert)).await {
            Ok(delivery) => delivery,
            Err(_) => Err(AlertError::Timeout(self.delivery_timeout)),
        };

        match delivery {
            Ok(()) => {
                info!(url = %target.url, %transition, transport = transport.name(), "Alert delivered");
                Dispatch::Delivered(alert)
            }
            Err(e) => {
                error!(
                    url = %target.url,
                    %transition,
                    transport = transport.name(),
                    error = %e,
                    "Failed to deliver alert"
                );
                Dispatch::Failed { alert, error: e }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use url::Url;

    #[derive(Default)]
    struct Recorder {
        delivered: Mutex<Vec<Alert>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl AlertTransport for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn deliver(&self, alert: &Alert) -> Result<(), AlertError> {
            if self.fail {
                return Err(AlertError::Transport("535 authentication failed".into()));
            }
            self.delivered.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    fn target() -> Target {
        Target::new(0, Url::parse("https://example.com").unwrap())
    }

    fn down_result() -> CheckResult {
        CheckResult::timed_out(&target(), Local::now(), Duration::from_secs(10))
    }

    #[test]
    fn test_default_policy_only_went_down() {
        let policy = AlertPolicy::default();
        assert!(policy.is_alertable(Transition::WentDown));
        assert!(!policy.is_alertable(Transition::WentUp));
        assert!(!policy.is_alertable(Transition::FirstObservationDown));
        assert!(!policy.is_alertable(Transition::None));

        let policy = policy.with_recovery().with_first_failure();
        assert!(policy.is_alertable(Transition::WentUp));
        assert!(policy.is_alertable(Transition::FirstObservationDown));
    }

    #[test]
    fn test_none_is_never_alertable() {
        let policy = AlertPolicy::new([Transition::None, Transition::WentDown]);
        assert_eq!(policy.transitions().collect::<Vec<_>>(), vec![Transition::WentDown]);
    }

    #[tokio::test]
    async fn test_dispatch_delivers_on_alertable_transition() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = AlertDispatcher::new(
            AlertPolicy::default(),
            Some(recorder.clone() as Arc<dyn AlertTransport>),
            Duration::from_secs(1),
        );

        let sent = dispatcher.maybe_alert(&target(), &down_result(), Transition::WentDown).await;
        let skipped = dispatcher.maybe_alert(&target(), &down_result(), Transition::None).await;

        assert!(sent.is_delivered());
        assert!(matches!(skipped, Dispatch::NotAlertable));
        assert_eq!(recorder.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported_not_raised() {
        let recorder = Arc::new(Recorder { fail: true, ..Default::default() });
        let dispatcher = AlertDispatcher::new(
            AlertPolicy::default(),
            Some(recorder as Arc<dyn AlertTransport>),
            Duration::from_secs(1),
        );

        let outcome = dispatcher.maybe_alert(&target(), &down_result(), Transition::WentDown).await;

        assert!(matches!(outcome, Dispatch::Failed { error: AlertError::Transport(_), .. }));
    }

    #[tokio::test]
    async fn test_disabled_dispatcher_still_flags_condition() {
        let dispatcher = AlertDispatcher::disabled(AlertPolicy::default());

        let outcome = dispatcher.maybe_alert(&target(), &down_result(), Transition::WentDown).await;

        assert!(matches!(outcome, Dispatch::NoTransport(_)));
    }

    #[test]
    fn test_alert_body_carries_payload() {
        let alert = Alert::new(AlertKind::Down, &down_result());

        assert_eq!(alert.subject(), "🚨 ALERT: https://example.com/ is DOWN");
        let body = alert.body();
        assert!(body.contains("URL: https://example.com/"));
        assert!(body.contains("Failure: timeout"));
        assert!(body.contains("Status Code: TIMEOUT"));
        assert!(body.contains("Response Time: 10000.00ms"));
    }
}
