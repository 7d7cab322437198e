use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use restock_watcher::config::{LoggingConfig, MetricsConfig, DEFAULT_CONFIG_PATH};
use restock_watcher::plugins::notifiers::{DiscordNotifier, LogNotifier};
use restock_watcher::plugins::NotifierPlugin;
use restock_watcher::scheduler::CycleScheduler;
use restock_watcher::scraper::ChromeFetcher;
use restock_watcher::{AppConfig, TrackingCoordinator};

#[derive(Parser, Debug)]
#[command(version, about = "Watches product listings for restocks and price changes")]
struct Args {
    /// Base configuration file (extension optional)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Run a single cycle, print its report as JSON and exit
    #[arg(long)]
    once: bool,

    /// Show the browser window while checking
    #[arg(long)]
    headed: bool,

    /// Log notifications instead of posting them
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("restock_watcher={}", config.level)))?;

    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "restock-watcher.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}

fn install_metrics_exporter(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install Prometheus exporter")?;
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry DISCORD_WEBHOOK; already-set variables win
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut config = AppConfig::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config))?;
    if args.headed {
        config.scraper.headless = false;
    }

    let _log_guard = init_tracing(&config.logging)?;
    install_metrics_exporter(&config.metrics)?;

    info!("Starting Restock Watcher for {} ({} sources)", config.item_name, config.sources.len());

    let notifier: Arc<dyn NotifierPlugin> = if args.dry_run {
        warn!("Dry run: notifications will be logged, not sent");
        Arc::new(LogNotifier)
    } else {
        Arc::new(
            DiscordNotifier::new(&config.notifications.discord)
                .context("no webhook configured; set DISCORD_WEBHOOK or pass --dry-run")?,
        )
    };
    let fetcher = Arc::new(ChromeFetcher::new(config.scraper.clone()));
    let coordinator = Arc::new(TrackingCoordinator::new(&config, fetcher, notifier));

    if args.once {
        let outcome = coordinator.run_cycle().await;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let mut scheduler = CycleScheduler::new(Arc::clone(&coordinator), config.scheduler.clone()).await?;
    scheduler.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    scheduler.shutdown().await?;
    let stats = scheduler.stats().await;
    info!(
        "Ran {} cycles ({} skipped, {} fully failed), {} events emitted",
        stats.completed_runs, stats.skipped_runs, stats.failed_runs, stats.events_emitted
    );

    Ok(())
}
