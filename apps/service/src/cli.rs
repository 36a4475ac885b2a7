//! Command-line surface. Values given here override the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, SmtpSettings};
use crate::monitoring::state::Transition;

#[derive(Debug, Default, Parser)]
#[command(name = "uptime-monitor", version, about = "Website uptime and performance monitor")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// URL to monitor; repeat for several. Replaces the config file's list
    #[arg(short = 'u', long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Request timeout in seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seconds between check cycles
    #[arg(short, long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Run a single check cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Check all targets of a cycle concurrently
    #[arg(long)]
    pub concurrent: bool,

    /// CSV file results are appended to
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Also alert when a target recovers
    #[arg(long)]
    pub alert_on_recovery: bool,

    /// Also alert when the very first check of a target fails
    #[arg(long)]
    pub alert_on_first_failure: bool,

    /// Log level for diagnostics (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, env = "SMTP_SERVER", value_name = "HOST")]
    pub smtp_server: Option<String>,

    #[arg(long, env = "SMTP_PORT", value_name = "PORT")]
    pub smtp_port: Option<u16>,

    #[arg(long, env = "SENDER_EMAIL", value_name = "ADDRESS")]
    pub sender_email: Option<String>,

    #[arg(long, env = "SENDER_PASSWORD", value_name = "PASSWORD", hide_env_values = true)]
    pub sender_password: Option<String>,

    #[arg(long, env = "RECIPIENT_EMAIL", value_name = "ADDRESS")]
    pub recipient_email: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,

    /// Write the effective configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub init_config: Option<PathBuf>,
}

impl Cli {
    /// Layer command-line values over `config`
    pub fn apply(&self, config: &mut Config) {
        if !self.urls.is_empty() {
            config.urls = self.urls.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if self.once {
            config.continuous = false;
        }
        if self.concurrent {
            config.concurrent = true;
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = log_file.clone();
        }
        if self.alert_on_recovery {
            push_unique(&mut config.alerts.on, Transition::WentUp);
        }
        if self.alert_on_first_failure {
            push_unique(&mut config.alerts.on, Transition::FirstObservationDown);
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        self.apply_smtp(config);
    }

    fn apply_smtp(&self, config: &mut Config) {
        let any_set = self.smtp_server.is_some()
            || self.smtp_port.is_some()
            || self.sender_email.is_some()
            || self.sender_password.is_some()
            || self.recipient_email.is_some();
        if !any_set {
            return;
        }

        let smtp = config.alerts.smtp.get_or_insert_with(SmtpSettings::default);
        if let Some(server) = &self.smtp_server {
            smtp.server = server.clone();
        }
        if let Some(port) = self.smtp_port {
            smtp.port = port;
        }
        if let Some(sender) = &self.sender_email {
            smtp.sender = sender.clone();
        }
        if let Some(password) = &self.sender_password {
            smtp.password = password.clone();
        }
        if let Some(recipient) = &self.recipient_email {
            smtp.recipient = recipient.clone();
        }
    }
}

fn push_unique(transitions: &mut Vec<Transition>, transition: Transition) {
    if !transitions.contains(&transition) {
        transitions.push(transition);
    }
}
