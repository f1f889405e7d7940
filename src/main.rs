//! krill - Command-line client for the Rookery binary cache protocol
//!
//! Sends one command fire-and-forget, then keeps the connection open for a
//! short window to print whatever the server streams back.

// Use jemalloc for better multi-threaded performance
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use krill::client::Client;
use krill::config::Config;
use krill::metrics::Metrics;
use krill::protocol::Ttl;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "krill", version, about = "Client for the Rookery binary cache protocol")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Server address (host:port), overrides configuration
    #[arg(short, long)]
    server: Option<String>,

    /// Session token, overrides configuration
    #[arg(short, long)]
    token: Option<String>,

    /// How long to keep reading responses before closing (milliseconds)
    #[arg(long, default_value_t = 1000)]
    wait_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a value under a key
    Set {
        key: String,
        value: String,
        /// TTL in seconds (0 = never expires)
        #[arg(long, default_value = "0")]
        ttl: Ttl,
    },
    /// Ask the server for the value stored under a key
    Get { key: String },
    /// Delete a key
    Del { key: String },
    /// Ask the server for the bulk listing of all live entries
    Ral,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(path) = &args.config {
        info!("Loading configuration from {}", path);
        Config::from_file(path)?
    } else {
        Config::from_env()
    };
    if let Some(server) = args.server {
        config.connection.server_addr = server;
    }
    if let Some(token) = args.token {
        config.connection.auth_token = token;
    }

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run(config, args.command, args.wait_ms))
}

async fn run(config: Config, command: Commands, wait_ms: u64) -> anyhow::Result<()> {
    let metrics = Arc::new(Metrics::new());
    let cancel_token = CancellationToken::new();

    info!("Connecting to {}", config.connection.server_addr);
    let (client, mut responses) =
        Client::connect(config, Arc::clone(&metrics), cancel_token.clone());

    match command {
        Commands::Set { key, value, ttl } => client.set(&key, &value, ttl).await?,
        Commands::Get { key } => client.get(&key).await?,
        Commands::Del { key } => client.del(&key).await?,
        Commands::Ral => client.ral().await?,
    }

    // Responses are raw bytes with no framing and no correlation to what we
    // sent; print whatever arrives within the wait window.
    let deadline = tokio::time::sleep(Duration::from_millis(wait_ms));
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut printed = false;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            chunk = responses.recv() => {
                match chunk {
                    Some(bytes) => {
                        print!("{}", String::from_utf8_lossy(&bytes));
                        printed = true;
                    }
                    None => break,
                }
            }
        }
    }
    if printed {
        println!();
    }

    client.shutdown().await;
    debug!(
        "Sent {} frames, read {} bytes",
        metrics.frames_sent.get(),
        metrics.bytes_read.get()
    );
    Ok(())
}
