//! Check-cycle driver.
//!
//! # States
//! ```text
//! Idle ──start──▶ RunningCycle ──single pass──▶ Stopped
//!                   │    ▲
//!        continuous │    │ interval elapsed
//!                   ▼    │
//!                  Sleeping ──cancel──▶ Stopped
//! ```
//!
//! Cancellation is observed between targets and during the sleep. An in-flight
//! check always completes (bounded by its timeout) and is fully recorded before
//! the scheduler stops.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use futures::future::join_all;
use thiserror::Error;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::alert::{Alert, AlertDispatcher, AlertError, Dispatch};
use super::checker::Checker;
use super::sink::ResultSink;
use super::state::{StateTracker, Transition};
use super::types::{CheckResult, Outcome, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningCycle,
    Sleeping,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    SinglePass,
    Continuous,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::SinglePass => write!(f, "single-pass"),
            RunMode::Continuous => write!(f, "continuous"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Default per-check timeout
    pub timeout: Duration,
    /// Pause between cycles in continuous mode
    pub interval: Duration,
    pub mode: RunMode,
    /// Run the checks of a cycle concurrently
    pub concurrent: bool,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler already stopped; construct a new one to run again")]
    AlreadyStopped,
}

/// Counts for one check cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle: u64,
    pub up: usize,
    pub down: usize,
    pub alerts_sent: usize,
    /// Cancelled before every target was checked
    pub interrupted: bool,
}

impl CycleSummary {
    pub fn checks(&self) -> usize {
        self.up + self.down
    }
}

/// Totals for a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub checks: u64,
    pub alerts_sent: u64,
    pub sleeps: u64,
    /// Stopped by the cancellation token rather than by completing a single pass
    pub interrupted: bool,
}

/// Hooks for presenting cycle progress. All methods default to no-ops.
pub trait CycleObserver: Send {
    fn cycle_started(&mut self, _cycle: u64, _at: DateTime<Local>) {}

    fn observed(&mut self, _result: &CheckResult, _transition: Transition) {}

    fn alert_delivered(&mut self, _alert: &Alert) {}

    fn alert_failed(&mut self, _alert: &Alert, _error: &AlertError) {}

    fn cycle_finished(&mut self, _summary: &CycleSummary) {}

    fn sleeping(&mut self, _interval: Duration) {}
}

impl CycleObserver for () {}

/// Monitoring scheduler - drives check cycles over the configured targets
pub struct MonitoringScheduler {
    targets: Vec<Target>,
    settings: ScheduleSettings,
    checker: Arc<dyn Checker>,
    tracker: StateTracker,
    sink: Box<dyn ResultSink>,
    alerts: AlertDispatcher,
    observer: Box<dyn CycleObserver>,
    cancel: CancellationToken,
    state: SchedulerState,
}

impl MonitoringScheduler {
    pub fn new(
        targets: Vec<Target>,
        settings: ScheduleSettings,
        checker: Arc<dyn Checker>,
        sink: Box<dyn ResultSink>,
        alerts: AlertDispatcher,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            targets,
            settings,
            checker,
            tracker: StateTracker::new(),
            sink,
            alerts,
            observer: Box::new(()),
            cancel,
            state: SchedulerState::Idle,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn CycleObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Run cycles until a single pass completes or the token is cancelled.
    ///
    /// `Stopped` is terminal: a second call returns [`SchedulerError::AlreadyStopped`].
    pub async fn run(&mut self) -> Result<RunSummary, SchedulerError> {
        if self.state == SchedulerState::Stopped {
            return Err(SchedulerError::AlreadyStopped);
        }

        info!(
            targets = self.targets.len(),
            mode = %self.settings.mode,
            concurrent = self.settings.concurrent,
            interval_secs = self.settings.interval.as_secs(),
            timeout_secs = self.settings.timeout.as_secs(),
            "Monitoring scheduler starting"
        );

        let mut summary = RunSummary::default();

        loop {
            if self.cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            self.enter(SchedulerState::RunningCycle);
            let cycle = self.run_cycle(summary.cycles + 1).await;
            summary.cycles += 1;
            summary.checks += cycle.checks() as u64;
            summary.alerts_sent += cycle.alerts_sent as u64;

            if cycle.interrupted {
                summary.interrupted = true;
                break;
            }
            if self.settings.mode == RunMode::SinglePass {
                break;
            }

            self.enter(SchedulerState::Sleeping);
            self.observer.sleeping(self.settings.interval);
            summary.sleeps += 1;

            let cancelled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => true,
                _ = time::sleep(self.settings.interval) => false,
            };
            if cancelled {
                summary.interrupted = true;
                break;
            }
        }

        self.enter(SchedulerState::Stopped);
        info!(
            cycles = summary.cycles,
            checks = summary.checks,
            alerts = summary.alerts_sent,
            interrupted = summary.interrupted,
            "Monitoring scheduler stopped"
        );

        Ok(summary)
    }

    /// One pass over every target, in configuration order
    async fn run_cycle(&mut self, cycle: u64) -> CycleSummary {
        self.observer.cycle_started(cycle, Local::now());
        let mut summary = CycleSummary { cycle, ..CycleSummary::default() };

        if self.settings.concurrent {
            // Checks overlap; results are still routed one at a time in configuration order
            for (index, result) in self.check_all().await.into_iter().enumerate() {
                self.handle_result(index, result, &mut summary).await;
            }
        } else {
            for index in 0..self.targets.len() {
                if self.cancel.is_cancelled() {
                    debug!(cycle, remaining = self.targets.len() - index, "Cycle cut short by cancellation");
                    summary.interrupted = true;
                    break;
                }

                let target = &self.targets[index];
                let result = self.checker.check(target, target.effective_timeout(self.settings.timeout)).await;
                self.handle_result(index, result, &mut summary).await;
            }
        }

        self.observer.cycle_finished(&summary);
        summary
    }

    async fn check_all(&self) -> Vec<CheckResult> {
        let checks = self
            .targets
            .iter()
            .map(|target| self.checker.check(target, target.effective_timeout(self.settings.timeout)));
        join_all(checks).await
    }

    /// Checker → StateTracker → ResultSink → AlertDispatcher for one result
    async fn handle_result(&mut self, index: usize, result: CheckResult, summary: &mut CycleSummary) {
        let transition = self.tracker.observe(&result);
        self.sink.record(&result);

        match result.outcome {
            Outcome::Up => summary.up += 1,
            Outcome::Down => summary.down += 1,
        }
        self.observer.observed(&result, transition);

        let target = &self.targets[index];
        match self.alerts.maybe_alert(target, &result, transition).await {
            Dispatch::Delivered(alert) => {
                summary.alerts_sent += 1;
                self.observer.alert_delivered(&alert);
            }
            Dispatch::Failed { alert, error } => self.observer.alert_failed(&alert, &error),
            Dispatch::NoTransport(_) | Dispatch::NotAlertable => {}
        }
    }

    fn enter(&mut self, next: SchedulerState) {
        debug!(from = ?self.state, to = ?next, "Scheduler state change");
        self.state = next;
    }
}
