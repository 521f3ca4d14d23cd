use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use reload_host::{HostConfig, Session, shutdown_signal};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reload-host")]
#[command(about = "Keep watched files loaded and reload them when they change")]
struct Cli {
    /// JSON configuration listing the files to watch
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = HostConfig::load(&cli.config)?;

    let mut session = Session::start(&config)?;
    session.run(shutdown_signal(tokio::signal::ctrl_c())).await;
    session.shutdown();

    Ok(())
}
