use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use uptime_monitor::cli::Cli;
use uptime_monitor::config::{Config, MonitorSettings};
use uptime_monitor::console::Console;
use uptime_monitor::monitoring::{
    AlertDispatcher, AlertTransport, CsvSink, FanoutSink, HttpChecker, MonitoringScheduler, SmtpTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_config(cli.config.as_deref())?;
    cli.apply(&mut config);

    logger::init(logger::parse_level(&config.logging.level));

    if let Some(path) = &cli.init_config {
        config.write_config(path)?;
        println!("Wrote configuration to {}", path.display());
        return Ok(());
    }
    if cli.print_config {
        print!("{config}");
        return Ok(());
    }

    let settings = config.validate()?;
    run(settings).await
}

async fn run(settings: MonitorSettings) -> Result<()> {
    let checker = Arc::new(HttpChecker::new().context("failed to build HTTP client")?);
    let dispatcher = AlertDispatcher::new(
        settings.alert_policy.clone(),
        alert_transport(&settings),
        settings.alert_delivery_timeout,
    );

    let mut console = Console::stdout();
    console.startup_banner(&settings, dispatcher.is_enabled());

    let mut sink = FanoutSink::new().with(Console::stdout());
    match CsvSink::open(&settings.log_file) {
        Ok(csv) => {
            if csv.created() {
                console.log_created(csv.path());
            }
            sink.push(Box::new(csv));
        }
        Err(e) => error!(
            path = %settings.log_file.display(),
            error = %e,
            "Could not open result log; results will only be shown on the console"
        ),
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let mut scheduler = MonitoringScheduler::new(
        settings.targets,
        settings.schedule,
        checker,
        Box::new(sink),
        dispatcher,
        cancel,
    )
    .with_observer(Box::new(Console::stdout()));

    let summary = scheduler.run().await?;

    if summary.interrupted {
        console.stopped_by_user();
    } else {
        console.single_pass_done();
    }
    info!(cycles = summary.cycles, checks = summary.checks, alerts = summary.alerts_sent, "Monitor exited");

    Ok(())
}

fn alert_transport(settings: &MonitorSettings) -> Option<Arc<dyn AlertTransport>> {
    let smtp = settings.smtp.as_ref()?;
    match SmtpTransport::new(smtp) {
        Ok(transport) => Some(Arc::new(transport) as Arc<dyn AlertTransport>),
        Err(e) => {
            warn!(error = %e, "Email alerts disabled: SMTP transport could not be configured");
            None
        }
    }
}

/// Cancel `token` on Ctrl+C, or SIGTERM on unix
async fn cancel_on_shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received, finishing in-flight check");
    token.cancel();
}
