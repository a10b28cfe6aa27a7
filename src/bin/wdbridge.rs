//! WebDriver dialect bridge CLI.
//!
//! # Commands
//!
//! - `serve` - Start the bridge server
//! - `status` - Query a running bridge's status endpoint

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wdbridge::{Config, Server, VERSION};

#[derive(Parser)]
#[command(name = "wdbridge")]
#[command(version = VERSION)]
#[command(about = "WebDriver dialect bridge - legacy/W3C negotiation and routing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge server
    Serve {
        /// Config file path (default: the platform config dir)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Upstream WebDriver endpoint URL (overrides config)
        #[arg(short, long)]
        upstream: Option<String>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Query a running bridge's status endpoint
    Status {
        /// Bridge base URL
        #[arg(default_value = "http://127.0.0.1:4444")]
        url: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            port,
            host,
            upstream,
            verbose,
        } => cmd_serve(config, port, host, upstream, verbose),
        Commands::Status { url } => cmd_status(&url),
    }
}

fn cmd_serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    host: Option<String>,
    upstream: Option<String>,
    verbose: bool,
) -> anyhow::Result<()> {
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    // File < environment < CLI flags.
    let mut config = match config_path.or_else(|| Config::default_path().filter(|p| p.exists())) {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config = config.merge(Config::from_env());

    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(upstream) = upstream {
        config.upstream.url = upstream;
    }

    tracing::info!("Upstream endpoint: {}", config.upstream.url);
    tracing::info!(
        "Idle eviction window: {}s, command timeout: {}s",
        config.server.idle_timeout_secs,
        config.server.command_timeout_secs
    );

    let server = Server::from_config(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async { server.run().await })?;
    Ok(())
}

fn cmd_status(url: &str) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let status_url = format!("{}/status", url.trim_end_matches('/'));
        let response = reqwest::get(&status_url).await?;
        let body: serde_json::Value = response.json().await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        Ok(())
    })
}
