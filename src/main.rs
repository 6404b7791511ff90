//! surface-rt - control-surface runtime
//!
//! Drives an Akai Fire, a Mackie Control compatible surface or a Launchpad
//! against a small in-memory host.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use surface_rt::clock::SystemClock;
use surface_rt::config::{ConfigWatcher, SurfaceConfig};
use surface_rt::devices::{DeviceKind, SurfaceContext};
use surface_rt::host::memory::MemoryHost;
use surface_rt::monitor;
use surface_rt::runtime::{StopReason, SurfaceRunner};
use surface_rt::setup;
use surface_rt::surface::ControlSurface;
use surface_rt::transport::{LogSink, MidiConnection, MidiSink, INPUT_QUEUE_CAPACITY};

/// Number of tracks in the built-in host
const DEMO_TRACKS: usize = 24;

/// Control-surface runtime for MIDI controllers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "surface.yaml")]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Also log to a daily rolling file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Override the device profile from the config file
    #[arg(short, long, value_enum)]
    device: Option<DeviceKind>,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Print decoded input from the device instead of running the surface
    #[arg(long)]
    monitor: bool,

    /// Run without hardware; outgoing messages are logged
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let (config_watcher, mut config) = load_config(&args.config).await?;
    if let Some(device) = args.device {
        config.device = device;
    }

    let level = args
        .log_level
        .clone()
        .or_else(|| config.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let log_file = args.log_file.clone().or_else(|| config.logging.file.clone());
    let _guard = init_logging(&level, log_file.as_deref())?;

    info!("Starting surface-rt v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config.display());

    let protocol = config.device.protocol();

    if args.list_ports {
        monitor::list_ports_formatted(protocol.port_pattern());
        return Ok(());
    }

    if args.monitor {
        return monitor::run_monitor(protocol, &config.input_pattern()).await;
    }

    let context = SurfaceContext::new(protocol).context("Failed to build device tables")?;
    let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);

    // Keep the connection alive for the whole run
    let (connection, sink): (Option<MidiConnection>, Arc<dyn MidiSink>) = if args.dry_run {
        info!("Dry run: no MIDI ports opened");
        let sink: Arc<dyn MidiSink> = Arc::new(LogSink);
        (None, sink)
    } else {
        let connection = MidiConnection::open(
            &config.input_pattern(),
            &config.output_pattern(),
            input_tx.clone(),
        )
        .context("Failed to connect to the device")?;
        let sink: Arc<dyn MidiSink> = connection.sink();
        (Some(connection), sink)
    };

    let mut surface = ControlSurface::new(
        context,
        sink,
        Arc::new(SystemClock::new()),
        &config.timing,
    );
    let host = MemoryHost::demo(DEMO_TRACKS);
    let _layout = setup::install(&mut surface, &host, config.device, &config.bank);

    // Dry runs have no input port; hold the sender so the loop keeps going
    let _dry_run_input = connection.is_none().then_some(input_tx);

    let runner = SurfaceRunner::new(surface, input_rx, config.timing);
    let (_surface, reason) = runner.run(config_watcher, shutdown_signal()).await;

    if reason == StopReason::InputClosed {
        warn!("Device disconnected");
    }
    drop(connection);
    info!("surface-rt shutdown complete");
    Ok(())
}

/// Load the config with hot reload, or fall back to defaults when the file is missing
async fn load_config(path: &Path) -> Result<(Option<ConfigWatcher>, SurfaceConfig)> {
    if !path.exists() {
        eprintln!("Config file {} not found, using defaults", path.display());
        return Ok((None, SurfaceConfig::default()));
    }
    let (watcher, config) = ConfigWatcher::new(path).await?;
    Ok((Some(watcher), config))
}

fn init_logging(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
