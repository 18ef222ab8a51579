//! Command-line entry point.
//!
//! `serve` runs the relay; `connect` is an interactive line client that
//! forwards stdin to the relay and prints whatever the relay sends back.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use topic_relay::client::RelayClient;
use topic_relay::protocol::constants::{DEFAULT_MAX_CLIENTS, TERMINATE_SENTINEL};
use topic_relay::protocol::Role;
use topic_relay::server::{RelayServer, ServerConfig};

/// Topic-scoped publish/subscribe relay.
#[derive(Debug, Parser)]
#[command(name = "topic-relay", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the relay server
    Serve {
        /// TCP port to listen on
        port: u16,
        /// Interface to bind
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        host: IpAddr,
        /// Maximum concurrent clients (0 = unlimited)
        #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
        max_clients: usize,
        /// Seconds between statistics reports (0 disables them)
        #[arg(long, default_value_t = 30)]
        stats_interval_secs: u64,
    },

    /// Connect to a relay and exchange lines interactively
    Connect {
        /// Relay address, e.g. 127.0.0.1:5000
        addr: String,
        /// PUBLISHER or SUBSCRIBER
        role: Role,
        /// Topic to register on
        topic: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            port,
            host,
            max_clients,
            stats_interval_secs,
        } => serve(SocketAddr::new(host, port), max_clients, stats_interval_secs).await,
        Command::Connect { addr, role, topic } => connect(&addr, role, &topic).await,
    }
}

async fn serve(addr: SocketAddr, max_clients: usize, stats_interval_secs: u64) -> anyhow::Result<()> {
    let mut config = ServerConfig::with_addr(addr).max_connections(max_clients);
    config = if stats_interval_secs == 0 {
        config.disable_stats()
    } else {
        config.stats_interval(Duration::from_secs(stats_interval_secs))
    };

    let server = RelayServer::new(config);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
        .with_context(|| format!("failed to serve on {addr}"))?;

    tracing::info!("Relay stopped");
    Ok(())
}

enum Event {
    Input(std::io::Result<Option<String>>),
    Relay(topic_relay::error::Result<Option<String>>),
}

async fn connect(addr: &str, role: Role, topic: &str) -> anyhow::Result<()> {
    let mut client = RelayClient::connect(addr, role, topic)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    tracing::info!(addr = %addr, role = %role, topic = %topic, "Connected");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let event = tokio::select! {
            line = stdin.next_line() => Event::Input(line),
            line = client.next_line() => Event::Relay(line),
        };

        match event {
            Event::Input(Ok(Some(line))) if line.starts_with(TERMINATE_SENTINEL) => break,
            Event::Input(Ok(Some(line))) => client.send_line(&line).await?,
            Event::Input(Ok(None)) => break,
            Event::Input(Err(e)) => return Err(e).context("failed to read stdin"),
            Event::Relay(Ok(Some(line))) => println!("{line}"),
            Event::Relay(Ok(None)) => {
                tracing::info!("Relay closed the connection");
                return Ok(());
            }
            Event::Relay(Err(e)) => return Err(e).context("connection to relay failed"),
        }
    }

    client.terminate().await?;
    tracing::info!("Disconnected");
    Ok(())
}
