//! Process entry point for the reference `OpenRTI` server node (§4.9,
//! §4.11): reads a server configuration document, binds every configured
//! listener, dials the configured parent (if any), and runs the
//! dispatcher until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use openrti_logging::LogFormat;
use openrti_net::parse_address;
use openrti_protocol::ServerPolicy;
use openrti_server::{read_config, InMemoryServerNode, Server, ServerConfig, ServerNode};

/// One tick of the dispatcher's `exec` loop (§4.3): short enough that a
/// `Ctrl-C` or a config reload request is noticed promptly, long enough
/// not to spin.
const TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Parser)]
#[command(name = "openrti-server", about = "OpenRTI server node")]
struct Args {
    /// Path to an `OpenRTIServerConfig` XML document (§4.11, §6.6).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Additional `rti://`/`pipe://`/`thread://` listener address; may be
    /// repeated. Combined with any `listen` elements in `--config`.
    #[arg(short, long = "listen")]
    listen: Vec<String>,

    /// Uplink address to connect to as this server's parent (§6.3).
    /// Overrides `parentServer` in `--config` when given.
    #[arg(long = "parent")]
    parent: Option<String>,

    /// Enables zlib compression preference on the handshake (§4.6 step 3).
    /// Overrides `enableZLibCompression` in `--config` when given.
    #[arg(long)]
    zlib: bool,

    /// Repeatable verbosity flag; see `openrti_logging::default_filter_for_verbosity`.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit structured JSON log lines instead of the compact format.
    #[arg(long)]
    json_logs: bool,
}

fn load_config(args: &Args) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            read_config(&content)?
        }
        None => ServerConfig::default(),
    };

    for listen in &args.listen {
        config.listen.push(openrti_server::ListenEntry { url: listen.clone() });
    }
    if let Some(parent) = &args.parent {
        config.parent_server_url = Some(parent.clone());
    }
    if args.zlib {
        config.enable_zlib_compression = true;
    }
    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    let policy = ServerPolicy {
        prefer_compression: config.enable_zlib_compression,
        zlib_available: true,
    };
    let node = InMemoryServerNode::new(openrti_server::server_options(policy));
    let mut server = Server::new(Arc::clone(&node) as Arc<dyn openrti_server::ServerNode>, policy);

    if config.listen.is_empty() {
        anyhow::bail!("no listen addresses configured; pass --listen or add <listen> to --config");
    }
    for entry in &config.listen {
        let address = parse_address(&entry.url)?;
        tracing::info!(url = %entry.url, "binding listener");
        server.bind_listener(&address).await?;
    }

    if let Some(parent_url) = &config.parent_server_url {
        let address = parse_address(parent_url)?;
        tracing::info!(url = %parent_url, "connecting to parent server");
        server
            .connect_parent(&address, config.enable_zlib_compression)
            .await?;
    }

    tracing::info!("server running");
    loop {
        server.run(Instant::now() + TICK).await;
        if !node.is_running() {
            tracing::info!("server node stopped; shutting down");
            break;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let format = if args.json_logs { LogFormat::Json } else { LogFormat::Compact };
    openrti_logging::init(args.verbose, format);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("openrti-server: {err}");
            ExitCode::FAILURE
        }
    }
}
