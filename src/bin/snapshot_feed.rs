use bevy::log::{error, info};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use airtrail::{config, feed, paths};

#[derive(Parser, Debug)]
#[command(version, about = "Websocket feed of aircraft snapshots")]
struct Args {
    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides server.bind_address
    #[arg(long)]
    bind: Option<String>,

    /// Serve demo traffic without querying OpenSky
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config_path = paths::resolve_config_path(args.config.as_deref());
    let mut app_config = config::load_config(&config_path);
    if let Some(bind) = args.bind {
        app_config.server.bind_address = bind;
    }

    info!("Starting snapshot feed");
    match feed::run(app_config, args.demo).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Snapshot feed stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
