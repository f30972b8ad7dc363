//! dila - status and control tool for JVC D-ILA projectors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use dila_remote as app;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use app::config::{AppConfig, ConfigLoadResult};
use app::jvc::{JvcClient, LogTrace};
use app::monitor::{Action, MonitorEvent, ProjectorMonitor};

/// Status and control tool for JVC D-ILA projectors.
#[derive(Parser)]
#[command(name = "dila", version)]
struct Cli {
    /// Config file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Projector host, overrides the config file
    #[arg(long, global = true)]
    host: Option<String>,

    /// Projector port, overrides the config file
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Debug logging plus a trace of every byte exchanged
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read every property once
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Handshake and report how long it took
    Ping,
    /// Switch the lamp on or off
    Power { state: PowerState },
    /// Recall a lens memory slot (1-10)
    Lens { slot: u8 },
    /// Poll continuously until interrupted
    Watch {
        /// Also write a daily rolling log file here
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PowerState {
    On,
    Off,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_dir = match &cli.command {
        Command::Watch { log_dir } => log_dir.clone(),
        _ => None,
    };
    let _guard = init_logging(cli.verbose, log_dir.as_deref());

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    tracing::debug!("Config path: {:?}", config_path);

    let config = || load_config(&config_path, cli.host.as_deref(), cli.port);

    match cli.command {
        Command::Status { json } => status(&config()?, cli.verbose, json).await,
        Command::Ping => ping(&config()?, cli.verbose).await,
        Command::Power { state } => {
            let action = match state {
                PowerState::On => Action::PowerOn,
                PowerState::Off => Action::PowerOff,
            };
            run_action(&config()?, action).await
        }
        Command::Lens { slot } => run_action(&config()?, Action::LensMemory(slot)).await,
        Command::Watch { .. } => watch_projector(&config()?).await,
        Command::InitConfig { force } => init_config(&config_path, cli.host.as_deref(), force),
    }
}

/// Install the stderr subscriber and, if requested, a rolling file writer.
fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_level = if verbose { "debug,dila_remote::wire=trace" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "dila.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn load_config(path: &Path, host: Option<&str>, port: Option<u16>) -> anyhow::Result<AppConfig> {
    let mut config = match AppConfig::try_load(path) {
        ConfigLoadResult::Loaded(config) => {
            tracing::debug!("Config loaded from {:?}", path);
            config
        }
        ConfigLoadResult::Missing if host.is_some() => AppConfig::default(),
        ConfigLoadResult::Missing => {
            bail!("no config at {path:?}; pass --host or run `dila init-config --host <HOST>`")
        }
        ConfigLoadResult::Invalid(e) => bail!("config {path:?} is invalid: {e}"),
    };

    if let Some(host) = host {
        config.projector.host = host.to_string();
    }
    if let Some(port) = port {
        config.projector.port = port;
    }
    config.validate()?;
    Ok(config)
}

fn init_config(path: &Path, host: Option<&str>, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{path:?} already exists; use --force to overwrite");
    }

    let mut config = AppConfig::default();
    if let Some(host) = host {
        config.projector.host = host.to_string();
    }
    config.save(path).with_context(|| format!("writing {path:?}"))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn client(config: &AppConfig, verbose: bool) -> JvcClient {
    let client = JvcClient::with_options(&config.projector.host, config.projector.client_options());
    if verbose { client.with_trace(Arc::new(LogTrace)) } else { client }
}

async fn status(config: &AppConfig, verbose: bool, json: bool) -> anyhow::Result<()> {
    let mut client = client(config, verbose);
    let result = client.read_info().await;
    client.disconnect().await;

    let info = result.with_context(|| format!("reading status from {}", client.address()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{info}");
    }
    Ok(())
}

async fn ping(config: &AppConfig, verbose: bool) -> anyhow::Result<()> {
    let mut client = client(config, verbose);
    let elapsed = client
        .ping()
        .await
        .with_context(|| format!("pinging {}", client.address()))?;
    println!("{} answered in {} ms", client.address(), elapsed.as_millis());
    Ok(())
}

async fn run_action(config: &AppConfig, action: Action) -> anyhow::Result<()> {
    let monitor = ProjectorMonitor::new(config);
    monitor
        .execute(action)
        .await
        .with_context(|| format!("{action:?} on {}", config.projector.host))?;
    println!("OK");
    Ok(())
}

async fn watch_projector(config: &AppConfig) -> anyhow::Result<()> {
    let monitor = Arc::new(ProjectorMonitor::new(config));
    let (tx, mut rx) = mpsc::channel(8);
    let (stop_tx, stop_rx) = watch::channel(false);

    let runner = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.run(tx, stop_rx).await })
    };

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(MonitorEvent::Status(info)) => println!(
                    "{} power={} lens={} model={}",
                    info.polled_at.format("%H:%M:%S"),
                    info.power,
                    info.lens_memory,
                    info.model.as_deref().unwrap_or("?"),
                ),
                Some(MonitorEvent::Error(e)) => tracing::error!("Poll failed: {e}"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping monitor");
                stop_tx.send_replace(true);
                break;
            }
        }
    }

    runner.await.context("monitor task panicked")?;
    Ok(())
}
