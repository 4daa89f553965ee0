use std::path::PathBuf;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use plain_mcp_server::server::Server;
use runtime::Config;
use tracing::info;

mod runtime;

/// Clap styling
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Arguments to the MCP server
#[derive(Debug, Parser)]
#[command(
    version,
    styles = STYLES,
    about = "Plain MCP Server - manage Plain customer support threads from an AI agent",
)]
struct Args {
    /// Path to the config file
    #[arg(long = "config", short = 'c')]
    config_flag: Option<PathBuf>,

    /// Path to the config file
    #[arg(conflicts_with = "config_flag")]
    config: Option<PathBuf>,
}

impl Args {
    fn config_path(self) -> Option<PathBuf> {
        self.config_flag.or(self.config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config: Config = match Args::parse().config_path() {
        Some(path) => runtime::read_config(path)?,
        None => runtime::read_config_from_env()?,
    };

    // The guard flushes the file log and has to outlive the server
    let _guard = config.logging.setup()?;

    info!(
        "Plain MCP Server v{} // Licensed under MIT",
        std::env!("CARGO_PKG_VERSION")
    );
    info!(
        level = %config.logging.level,
        transport = ?config.transport,
        "Loaded configuration"
    );

    Ok(Server::builder()
        .transport(config.transport.clone())
        .client_config(config.client_config()?)
        .build()
        .start()
        .await?)
}
