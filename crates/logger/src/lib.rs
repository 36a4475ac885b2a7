//! Tracing subscriber setup shared by the workspace binaries.
//!
//! Output format is picked from `RUST_LOG_FORMAT` (`json` or compact text) and
//! the filter from `RUST_LOG`, falling back to the level handed in by the caller.

use std::env::var;

pub use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, filter::EnvFilter};

/// Install the global subscriber. Panics if one is already installed.
pub fn init(level: LevelFilter) {
    build_subscriber(level).init();
}

/// Install the global subscriber unless one already exists.
///
/// Returns `true` when this call installed it.
pub fn try_init(level: LevelFilter) -> bool {
    build_subscriber(level).try_init().is_ok()
}

/// Parse a level name such as `"debug"`; unknown names fall back to `INFO`.
pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or_else(|_| {
        warn!(level = name, "Unknown log level, falling back to info");
        LevelFilter::INFO
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    fn from_env() -> Self {
        match var("RUST_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

type Subscriber = Layered<Box<dyn Layer<Registry> + Send + Sync>, Registry>;

/// Diagnostics always go to stderr; stdout belongs to the program's own report
fn build_subscriber(level: LevelFilter) -> Subscriber {
    build_subscriber_with(level, LogFormat::from_env(), std::io::stderr)
}

fn build_subscriber_with<W>(level: LevelFilter, format: LogFormat, writer: W) -> Subscriber
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_writer(writer)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(log_layer)
}
