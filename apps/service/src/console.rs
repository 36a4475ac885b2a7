//! Human-facing progress report on stdout.
//!
//! Diagnostics go through `tracing`; this is the operator's view of each
//! cycle: banners, one line per result, alert notices and summaries.

use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use crossterm::style::Stylize;

use crate::config::MonitorSettings;
use crate::monitoring::alert::{Alert, AlertError};
use crate::monitoring::scheduler::{CycleObserver, CycleSummary};
use crate::monitoring::sink::ResultSink;
use crate::monitoring::state::Transition;
use crate::monitoring::types::{CheckResult, TIMESTAMP_FORMAT};

const RULE_WIDTH: usize = 70;

pub struct Console {
    out: Box<dyn Write + Send>,
    color: bool,
}

impl Console {
    /// Console on stdout, coloured when stdout is a terminal
    pub fn stdout() -> Self {
        let color = io::stdout().is_terminal();
        Self::new(Box::new(io::stdout()), color)
    }

    pub fn new(out: Box<dyn Write + Send>, color: bool) -> Self {
        Self { out, color }
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        // A closed stdout must not take the monitor down
        let _ = writeln!(self.out, "{args}");
        let _ = self.out.flush();
    }

    fn rule(&mut self) {
        self.line(format_args!("{}", "=".repeat(RULE_WIDTH)));
    }

    fn marker(&self, up: bool) -> String {
        match (up, self.color) {
            (true, true) => "✓".green().to_string(),
            (false, true) => "✗".red().to_string(),
            (true, false) => "✓".to_string(),
            (false, false) => "✗".to_string(),
        }
    }

    pub fn startup_banner(&mut self, settings: &MonitorSettings, alerts_enabled: bool) {
        self.line(format_args!(""));
        self.rule();
        self.line(format_args!("Website Uptime Monitor Started"));
        self.rule();
        self.line(format_args!("Monitoring {} URL(s)", settings.targets.len()));
        self.line(format_args!("Mode: {}", settings.schedule.mode));
        self.line(format_args!("Check interval: {} seconds", settings.schedule.interval.as_secs()));
        self.line(format_args!("Timeout: {} seconds", settings.schedule.timeout.as_secs()));
        self.line(format_args!("Email alerts: {}", if alerts_enabled { "Enabled" } else { "Disabled" }));
        self.line(format_args!("Log file: {}", settings.log_file.display()));
        self.rule();
    }

    pub fn log_created(&mut self, path: &Path) {
        let marker = self.marker(true);
        self.line(format_args!("{marker} Created log file: {}", path.display()));
    }

    pub fn result_line(&mut self, result: &CheckResult) {
        let marker = self.marker(result.is_up());
        self.line(format_args!(
            "{marker} [{}] {} - {} - {:.2}ms - Code: {}",
            result.formatted_timestamp(),
            result.url,
            result.outcome,
            result.latency_ms(),
            result.status
        ));
    }

    pub fn single_pass_done(&mut self) {
        let marker = self.marker(true);
        self.line(format_args!(""));
        self.line(format_args!("{marker} Single check completed"));
    }

    pub fn stopped_by_user(&mut self) {
        self.line(format_args!(""));
        self.rule();
        self.line(format_args!("Monitor stopped by user"));
        self.rule();
    }
}

impl ResultSink for Console {
    fn record(&mut self, result: &CheckResult) {
        self.result_line(result);
    }
}

impl CycleObserver for Console {
    fn cycle_started(&mut self, _cycle: u64, at: DateTime<Local>) {
        self.line(format_args!(""));
        self.rule();
        self.line(format_args!("Starting check cycle at {}", at.format(TIMESTAMP_FORMAT)));
        self.rule();
    }

    fn observed(&mut self, result: &CheckResult, transition: Transition) {
        if transition == Transition::WentUp {
            let marker = self.marker(true);
            self.line(format_args!("  {marker} {} is back UP!", result.url));
        }
    }

    fn alert_delivered(&mut self, alert: &Alert) {
        self.line(format_args!("  📧 Alert sent for {}", alert.url));
    }

    fn alert_failed(&mut self, alert: &Alert, error: &AlertError) {
        self.line(format_args!("  ⚠ Failed to send alert for {}: {error}", alert.url));
    }

    fn cycle_finished(&mut self, summary: &CycleSummary) {
        self.line(format_args!("Cycle complete: {} up, {} down", summary.up, summary.down));
    }

    fn sleeping(&mut self, interval: Duration) {
        self.line(format_args!(""));
        self.line(format_args!(
            "⏳ Next check in {} seconds... (Press Ctrl+C to stop)",
            interval.as_secs()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::Target;
    use std::sync::{Arc, Mutex};
    use url::Url;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn target() -> Target {
        Target::new(0, Url::parse("https://example.com").unwrap())
    }

    #[test]
    fn test_result_line_without_color() {
        let buffer = Buffer::default();
        let mut console = Console::new(Box::new(buffer.clone()), false);
        let result = CheckResult::timed_out(&target(), Local::now(), Duration::from_secs(10));

        console.record(&result);

        let text = buffer.text();
        assert!(text.starts_with("✗ ["));
        assert!(text.contains("https://example.com/ - DOWN - 10000.00ms - Code: TIMEOUT"));
    }

    #[test]
    fn test_recovery_notice_only_on_went_up() {
        let buffer = Buffer::default();
        let mut console = Console::new(Box::new(buffer.clone()), false);
        let result = CheckResult::responded(&target(), Local::now(), 200, Duration::from_millis(12));

        console.observed(&result, Transition::None);
        assert!(buffer.text().is_empty());

        console.observed(&result, Transition::WentUp);
        assert!(buffer.text().contains("https://example.com/ is back UP!"));
    }
}
