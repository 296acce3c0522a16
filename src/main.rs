use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use aqualink::{default_config_path, init_logging, Config, Monitor, BUILD_DATE, VERSION};

/// Monitor an AquaLink water-quality sensor from the command line.
#[derive(Parser, Debug)]
#[command(name = "aqualink", version, about)]
struct Cli {
    /// Path to a .toml or .json config file.
    #[arg(long, env = "AQUALINK_CONFIG")]
    config: Option<PathBuf>,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Override the telemetry period in milliseconds.
    #[arg(long)]
    telemetry_interval_ms: Option<u64>,

    /// Print every device event as a JSON line on stdout.
    #[arg(long)]
    json_events: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;
    info!("AquaLink {} (built {})", VERSION, BUILD_DATE);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(interval_ms) = cli.telemetry_interval_ms {
        config.telemetry.interval_ms = interval_ms;
        config
            .validate()
            .context("invalid --telemetry-interval-ms")?;
    }

    let monitor = Monitor::simulated(&config).context("failed to build connectivity service")?;
    let service = monitor.service();

    if cli.json_events {
        let mut events = service.bus().receiver();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Failed to encode {}: {}", event.description(), e),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event output fell behind, skipped {} events", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    let (connected_tx, mut connected_rx) = tokio::sync::watch::channel(false);
    service.on_connection(move |status| {
        let _ = connected_tx.send(status.is_connected());
    });
    service.on_command_response(|result| {
        info!(command = %result.command, status = %result.status, "{}", result.message);
    });
    service.bus().on_error(|reason| warn!("Device link failed: {}", reason));

    service.start();

    let deadline = async {
        match cli.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let save_params = config.save_command_params();
    let mut saved = false;
    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Session duration elapsed");
                break;
            }
            signal = &mut ctrl_c => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("Interrupted");
                break;
            }
            changed = connected_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let connected = *connected_rx.borrow_and_update();
                if connected && !saved {
                    match service.send_command("saveConfig", save_params.clone()) {
                        Ok(()) => saved = true,
                        Err(e) => warn!("Could not push configuration: {}", e),
                    }
                }
            }
        }
    }

    service.stop();
    println!("{}", monitor.summary());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => match default_config_path() {
            Ok(path) => Config::load_or_default(&path)
                .with_context(|| format!("failed to load config from {}", path.display())),
            Err(e) => {
                warn!("{}, using defaults", e);
                Ok(Config::default())
            }
        },
    }
}
