//! Line-protocol TCP server for the lobby.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lobby_server::config::Config;
use lobby_server::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Lobby, matchmaking and game-room server")]
struct Cli {
    /// TOML configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to
    #[clap(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[clap(short, long)]
    port: Option<u16>,

    /// Maximum simultaneous connections
    #[clap(long)]
    max_clients: Option<usize>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(max_clients) = cli.max_clients {
        config.max_clients = max_clients;
    }

    info!(
        "starting lobby-server on {} (group {}, max_clients = {})",
        config.socket_addr_string(),
        config.group,
        config.max_clients
    );

    server::run(config).await
}
