/// Monitoring engine module - the polling and alert-state engine
///
/// This module is responsible for:
/// - Executing bounded-timeout HTTP checks
/// - Tracking up/down state per target and detecting transitions
/// - Persisting every result
/// - Deciding when an alert fires and delivering it
/// - Driving check cycles until a single pass completes or the run is cancelled
pub mod alert;
pub mod checker;
pub mod scheduler;
pub mod sink;
pub mod smtp;
pub mod state;
pub mod types;

pub use alert::{AlertDispatcher, AlertPolicy, AlertTransport};
pub use checker::{Checker, HttpChecker};
pub use scheduler::{MonitoringScheduler, RunMode, ScheduleSettings, SchedulerState};
pub use sink::{CsvSink, FanoutSink, ResultSink};
pub use smtp::SmtpTransport;
pub use state::{StateTracker, Transition};
pub use types::{CheckResult, CheckStatus, Outcome, Target};
