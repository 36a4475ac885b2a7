use std::{env, fmt, fs, io, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::monitoring::alert::AlertPolicy;
use crate::monitoring::scheduler::{RunMode, ScheduleSettings};
use crate::monitoring::state::Transition;
use crate::monitoring::types::Target;
use crate::validation::{validate_check_interval, validate_http_endpoint, validate_timeout};

/// Fatal configuration problems, all detected before the first cycle
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: path::PathBuf, source: io::Error },
    #[error("failed to write config file {path}: {source}")]
    Write { path: path::PathBuf, source: io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: path::PathBuf, source: toml::de::Error },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("could not determine a config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
    #[error("no URLs configured; add `urls` to the config file or pass --url")]
    NoTargets,
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(u64),
    #[error("check interval must be a positive number of seconds, got {0}")]
    InvalidInterval(u64),
    #[error("invalid alert settings: {0}")]
    InvalidAlertSettings(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Targets, checked in this order every cycle
    pub urls: Vec<String>,
    pub timeout_secs: u64,
    pub interval_secs: u64,
    /// Keep cycling until interrupted; `false` runs a single pass
    pub continuous: bool,
    /// Check targets of a cycle concurrently
    pub concurrent: bool,
    pub log_file: path::PathBuf,
    pub alerts: AlertConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alertable transitions
    pub on: Vec<Transition>,
    pub delivery_timeout_secs: u64,
    /// Absent or incomplete disables delivery
    pub smtp: Option<SmtpSettings>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub sender: String,
    pub password: String,
    pub recipient: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            timeout_secs: 10,
            interval_secs: 60,
            continuous: true,
            concurrent: false,
            log_file: path::PathBuf::from("uptime_log.csv"),
            alerts: AlertConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { on: vec![Transition::WentDown], delivery_timeout_secs: 30, smtp: None }
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            server: "smtp.gmail.com".into(),
            port: 587,
            sender: String::new(),
            password: String::new(),
            recipient: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

impl SmtpSettings {
    /// Delivery needs a server, sender, password and recipient
    pub fn is_complete(&self) -> bool {
        !self.server.is_empty()
            && !self.sender.is_empty()
            && !self.password.is_empty()
            && !self.recipient.is_empty()
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &"********")
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Validated, immutable settings handed to the engine
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub targets: Vec<Target>,
    pub schedule: ScheduleSettings,
    pub log_file: path::PathBuf,
    pub alert_policy: AlertPolicy,
    pub alert_delivery_timeout: Duration,
    /// `None` when alert delivery is disabled
    pub smtp: Option<SmtpSettings>,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/uptime-monitor/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("uptime-monitor/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Monitor Configuration:")?;
        write_title_1(f, "Targets")?;
        for url in &self.urls {
            write_2(f, "URL", url)?;
        }
        write_title_1(f, "Schedule")?;
        write_1(f, "Timeout (s)", &self.timeout_secs)?;
        write_1(f, "Interval (s)", &self.interval_secs)?;
        write_1(f, "Continuous", &self.continuous)?;
        write_1(f, "Concurrent", &self.concurrent)?;
        write_1(f, "Log File", &self.log_file.display())?;
        write_title_1(f, "Alerts")?;
        let on: Vec<String> = self.alerts.on.iter().map(ToString::to_string).collect();
        write_1(f, "On", &on.join(", "))?;
        write_1(f, "Delivery Timeout (s)", &self.alerts.delivery_timeout_secs)?;
        match &self.alerts.smtp {
            Some(smtp) => {
                write_1(f, "SMTP Server", &format!("{}:{}", smtp.server, smtp.port))?;
                write_1(f, "Sender", &smtp.sender)?;
                write_1(f, "Password", &if smtp.password.is_empty() { "(unset)" } else { "********" })?;
                write_1(f, "Recipient", &smtp.recipient)?;
            }
            None => write_1(f, "SMTP", &"disabled")?,
        }
        write_title_1(f, "Logging")?;
        write_1(f, "Level", &self.logging.level)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// With an explicit path the file must exist. Without one the default
    /// location is tried and a missing file yields the defaults.
    ///
    /// ```no_run
    /// use uptime_monitor::config::Config;
    ///
    /// let cfg = Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), uptime_monitor::config::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        match optional_path {
            Some(path) => Self::load(&normalize_toml_path(path.as_ref())),
            None => {
                let config_path = default_config_path()?;
                if config_path.exists() { Self::load(&config_path) } else { Ok(Self::default()) }
            }
        }
    }

    /// Read and parse a TOML config file
    pub fn load(path: &path::Path) -> Result<Self, ConfigError> {
        let raw_string = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(raw_string.as_str())
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        fs::write(path, config_str).map_err(write_err)
    }

    /// Check every value and build the settings the engine runs with
    pub fn validate(&self) -> Result<MonitorSettings, ConfigError> {
        if self.urls.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let targets = self
            .urls
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                validate_http_endpoint(raw).map(|url| Target::configured(index, raw.as_str(), url))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let timeout = validate_timeout(self.timeout_secs)?;
        let interval = validate_check_interval(self.interval_secs)?;

        let smtp = match &self.alerts.smtp {
            Some(smtp) if smtp.port == 0 => {
                return Err(ConfigError::InvalidAlertSettings("SMTP port must not be 0".into()));
            }
            Some(smtp) if smtp.is_complete() => Some(smtp.clone()),
            Some(_) => {
                warn!("SMTP settings are incomplete (server, sender, password and recipient are required); email alerts disabled");
                None
            }
            None => None,
        };

        Ok(MonitorSettings {
            targets,
            schedule: ScheduleSettings {
                timeout,
                interval,
                mode: if self.continuous { RunMode::Continuous } else { RunMode::SinglePass },
                concurrent: self.concurrent,
            },
            log_file: self.log_file.clone(),
            alert_policy: AlertPolicy::new(self.alerts.on.iter().copied()),
            alert_delivery_timeout: Duration::from_secs(self.alerts.delivery_timeout_secs.max(1)),
            smtp,
        })
    }
}
