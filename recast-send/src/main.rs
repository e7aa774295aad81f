//! recast-send - Background daemon for recurring republishing
//!
//! Evaluates the stored schedules at regular intervals and republishes
//! queued posts whose next occurrence has arrived.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use librecast::platforms::command::CommandPlatform;
use librecast::platforms::mock::MockPlatform;
use librecast::platforms::Platform;
use librecast::{
    Config, Governor, JsonStore, PostPublisher, PublishOptions, RecastError, Result,
    TriggerEvaluator,
};
use tokio::time::{sleep, Duration};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "recast-send")]
#[command(version)]
#[command(about = "Background daemon for recurring republishing")]
#[command(long_about = "\
recast-send - Background daemon for recurring republishing

DESCRIPTION:
    recast-send is a long-running daemon that evaluates your repeating
    schedules and republishes backed-up or drafted posts when their next
    occurrence arrives.

    Each tick it loads the schedule list, computes the next occurrence of
    every active schedule from its recurrence rule, and hands due schedules
    to the configured posting command. Occurrences missed while the daemon
    was down are skipped, not caught up.

USAGE:
    # Run in foreground (logs to stderr)
    recast-send

    # Run with custom tick interval
    recast-send --poll-interval 5

    # Fire one schedule immediately
    recast-send --trigger-now <SCHEDULE_ID>

    # Preview a schedule's next posts and occurrences
    recast-send --lookups <SCHEDULE_ID>

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes the current tick)

CONFIGURATION:
    Configuration file: ~/.config/recast/config.toml
    App data location:  ~/.local/share/recast/appdata.json

    [store]
    path = \"~/.local/share/recast/appdata.json\"

    [scheduling]
    tick_interval_minutes = 1   # minutes between ticks
    governor_interval_ms = 1000 # minimum spacing between publish calls
    max_attempts = 3            # publish attempts per account
    retry_delay_secs = 5        # pause between attempts

    [platform]
    command = \"post-tool --json\" # posting command, content on stdin

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration error
    3 - Invalid input
    4 - Not found

For more information, visit: https://github.com/recast/recast
")]
struct Cli {
    /// Tick interval in minutes (overrides config)
    #[arg(long, value_name = "MINUTES")]
    #[arg(help = "How often to evaluate schedules (default: 1)")]
    poll_interval: Option<u64>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    #[arg(help = "Enable verbose logging (useful for debugging)")]
    verbose: bool,

    /// Run one tick and exit (for testing)
    #[arg(long, hide = true)]
    #[arg(help = "Evaluate schedules once and exit (for testing)")]
    once: bool,

    /// Fire a schedule immediately and exit
    #[arg(long, value_name = "SCHEDULE_ID", conflicts_with = "lookups")]
    #[arg(help = "Publish the schedule's next post now, regardless of its rule")]
    trigger_now: Option<String>,

    /// Print a schedule's next posts and occurrences as JSON and exit
    #[arg(long, value_name = "SCHEDULE_ID")]
    #[arg(help = "Preview the next posts and occurrences without publishing")]
    lookups: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let evaluator = build_evaluator(&config)?;

    if let Some(schedule_id) = &cli.lookups {
        let lookups = evaluator.compute_lookups(schedule_id, None).await?;
        let json = serde_json::to_string_pretty(&lookups)
            .map_err(|e| RecastError::InvalidInput(format!("failed to encode lookups: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    if let Some(schedule_id) = &cli.trigger_now {
        info!("Triggering schedule {} now", schedule_id);
        evaluator.trigger_now(schedule_id).await?;
        return Ok(());
    }

    info!("recast-send daemon starting");

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    let tick_interval_secs = cli
        .poll_interval
        .map(|minutes| minutes.max(1) * 60)
        .unwrap_or_else(|| config.scheduling.tick_interval().as_secs());
    info!("Tick interval: {}s", tick_interval_secs);

    if cli.once {
        evaluator.tick().await;
        info!("recast-send: evaluated schedules once, exiting");
    } else {
        run_daemon_loop(&evaluator, tick_interval_secs, shutdown).await;
    }

    info!("recast-send daemon stopped");
    Ok(())
}

/// Wire the store, governor, platform, and evaluator from configuration.
fn build_evaluator(config: &Config) -> Result<TriggerEvaluator> {
    let store = Arc::new(JsonStore::new(config.store_path()?));
    let governor = Arc::new(Governor::new(config.scheduling.governor_interval()));

    let platform: Arc<dyn Platform> = match &config.platform.command {
        Some(command) => Arc::new(CommandPlatform::new(command)?),
        None => {
            // No posting command configured: publish calls succeed locally
            // so the queue and schedule state still advance (dry-run mode).
            info!("no platform.command configured, running in dry-run mode");
            Arc::new(MockPlatform::success("dry-run"))
        }
    };

    let publisher =
        PostPublisher::new(store.clone(), platform, governor).with_options(PublishOptions {
            max_attempts: config.scheduling.max_attempts,
            retry_delay: config.scheduling.retry_delay(),
        });

    Ok(TriggerEvaluator::new(
        store.clone(),
        store,
        publisher,
        config.scheduling.tick_interval(),
    ))
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| RecastError::InvalidInput(format!("Signal setup failed: {}", e)))?;

    let shutdown_clone = shutdown.clone();
    std::thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGTERM | SIGINT => {
                    info!("Received shutdown signal, stopping gracefully...");
                    shutdown_clone.store(true, Ordering::Relaxed);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: Arc<AtomicBool>) -> Result<()> {
    Ok(())
}

/// Main daemon loop
async fn run_daemon_loop(
    evaluator: &TriggerEvaluator,
    tick_interval_secs: u64,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, stopping daemon loop");
            break;
        }

        evaluator.tick().await;

        // Sleep until the next tick (check shutdown every second)
        for _ in 0..tick_interval_secs {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            sleep(Duration::from_secs(1)).await;
        }
    }
}
