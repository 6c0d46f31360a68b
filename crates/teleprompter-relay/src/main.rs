//! Teleprompter remote-control relay: entry point.
//!
//! Runs the relay as a child process of the desktop host.  The host talks to
//! it over the standard streams:
//!
//! - **stdout** carries one JSON [`RelayNotification`] per line, e.g.
//!   `{"option":"qr","data":"192.168.1.20"}`.  This is the presentation sink.
//! - **stdin** accepts one control message per line: `network` starts the
//!   relay, `prepareLinks` asks the window to prepare its links, `quit` shuts
//!   down.
//! - **stderr** carries logs.
//!
//! # Usage
//!
//! ```text
//! teleprompter-relay [OPTIONS]
//!
//! Options:
//!   --config <PATH>     Config file [default: platform config dir/relay.toml]
//!   --port <PORT>       WebSocket listener port [env: TELEPROMPTER_PORT]
//!   --bind <IP>         Bind address [env: TELEPROMPTER_BIND]
//!   --retry-ms <MS>     Address retry interval in milliseconds
//!   --no-advertise      Do not publish or browse mDNS records
//!   --no-autostart      Wait for `network` on stdin before starting
//! ```
//!
//! CLI values override the config file; the file overrides built-in defaults.
//! `RUST_LOG` overrides the file's `log_level`.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use teleprompter_core::RelayNotification;
use teleprompter_relay::application::{
    PresentationSink, RelayCoordinator, RelayError, RelayReady,
};
use teleprompter_relay::infrastructure::storage::{load_config, RelayFileConfig};
use teleprompter_relay::infrastructure::{
    MdnsAdvertiser, NoopAdvertiser, ServiceAdvertiser, SystemAddressResolver,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Teleprompter remote-control relay.
///
/// Lets a phone on the same network drive the Teleprompter window.
#[derive(Debug, Parser)]
#[command(
    name = "teleprompter-relay",
    about = "Remote-control relay for the Teleprompter window",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// TCP port for the WebSocket listener.  Also the advertised port.
    #[arg(long, env = "TELEPROMPTER_PORT")]
    port: Option<u16>,

    /// IP address to bind the listener to (`0.0.0.0` for all interfaces).
    #[arg(long, env = "TELEPROMPTER_BIND")]
    bind: Option<String>,

    /// Delay between address-resolution attempts, in milliseconds.
    #[arg(long)]
    retry_ms: Option<u64>,

    /// Disable mDNS advertisement and peer discovery.
    #[arg(long)]
    no_advertise: bool,

    /// Do not start the relay until `network` is received on stdin.
    #[arg(long)]
    no_autostart: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file config.
    fn apply_overrides(&self, mut file: RelayFileConfig) -> RelayFileConfig {
        if let Some(port) = self.port {
            file.relay.port = port;
        }
        if let Some(bind) = &self.bind {
            file.relay.bind_address = bind.clone();
        }
        if let Some(retry_ms) = self.retry_ms {
            file.relay.retry_interval_ms = retry_ms;
        }
        if self.no_advertise {
            file.advertisement.enabled = false;
        }
        file
    }
}

// ── Host control messages ─────────────────────────────────────────────────────

/// One line of control input from the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostCommand {
    Network,
    PrepareLinks,
    Quit,
}

impl FromStr for HostCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "network" => Ok(Self::Network),
            "prepareLinks" => Ok(Self::PrepareLinks),
            "quit" => Ok(Self::Quit),
            other => Err(other.to_string()),
        }
    }
}

// ── Stdout sink ───────────────────────────────────────────────────────────────

/// Writes each notification to stdout as one JSON line.
struct StdoutSink;

impl PresentationSink for StdoutSink {
    fn deliver(&self, notification: RelayNotification) {
        let line = match serde_json::to_string(&notification) {
            Ok(line) => line,
            Err(e) => {
                error!("failed to encode notification: {e}");
                return;
            }
        };
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!("failed to write notification to stdout: {e}");
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

type PendingStartup = Pin<Box<dyn Future<Output = Result<RelayReady, RelayError>> + Send>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = load_config(cli.config.as_deref()).context("failed to load relay config")?;
    let file = cli.apply_overrides(file);

    // Logs go to stderr; stdout is reserved for notifications.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&file.relay.log_level)),
        )
        .init();

    let config = file
        .to_relay_config()
        .context("invalid relay configuration")?;
    info!(
        "Teleprompter relay starting: bind={}, advertise={}",
        config.bind_addr, config.advertise
    );

    let advertiser = build_advertiser(config.advertise);
    let relay = RelayCoordinator::new(
        config,
        Arc::new(StdoutSink),
        Arc::new(SystemAddressResolver::new()),
        advertiser,
    );

    let mut pending: Option<PendingStartup> = None;
    if !cli.no_autostart {
        pending = Some(Box::pin(relay.start_relay()?.wait()));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let outcome: anyhow::Result<()> = loop {
        tokio::select! {
            result = wait_pending(&mut pending) => {
                pending = None;
                match result {
                    Ok(ready) => info!("relay reachable at {} (port {})", ready.address, ready.local_addr.port()),
                    Err(RelayError::Cancelled) => {}
                    Err(e) => break Err(anyhow::Error::new(e).context("relay failed to start")),
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<HostCommand>() {
                    Ok(HostCommand::Network) => match relay.start_relay() {
                        Ok(startup) => pending = Some(Box::pin(startup.wait())),
                        Err(e) => warn!("ignoring `network`: {e}"),
                    },
                    Ok(HostCommand::PrepareLinks) => relay.request_link_preparation(),
                    Ok(HostCommand::Quit) => {
                        info!("quit requested by host");
                        break Ok(());
                    }
                    Err(unknown) => warn!("unknown control message {unknown:?}"),
                },
                Ok(None) => {
                    debug!("stdin closed; control messages disabled");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("failed to read stdin: {e}");
                    stdin_open = false;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("received Ctrl+C; initiating graceful shutdown"),
                    Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
                }
                break Ok(());
            }
        }
    };

    relay.shutdown().await;
    info!("Teleprompter relay stopped");
    outcome
}

async fn wait_pending(pending: &mut Option<PendingStartup>) -> Result<RelayReady, RelayError> {
    match pending {
        Some(startup) => startup.await,
        None => std::future::pending().await,
    }
}

/// mDNS when enabled and available, otherwise a no-op.
fn build_advertiser(enabled: bool) -> Arc<dyn ServiceAdvertiser> {
    if !enabled {
        return Arc::new(NoopAdvertiser);
    }
    match MdnsAdvertiser::new() {
        Ok(advertiser) => Arc::new(advertiser),
        Err(e) => {
            warn!("LAN advertisement unavailable: {e}");
            Arc::new(NoopAdvertiser)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
