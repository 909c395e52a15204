use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use zonemeet::{config::Config, net::http, start_engine};

#[derive(Debug, Parser)]
#[command(name = "zonemeet", version, about = "Shared grid world session server")]
struct Args {
    /// TOML config file (if omitted, use env/.env)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen address (eg: "127.0.0.1:3000")
    #[arg(long)]
    addr: Option<String>,

    /// Directory with the browser client, served next to /ws
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing()?;

    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if let Some(addr) = args.addr {
        cfg.http_addr = addr;
    }
    if let Some(dir) = args.static_dir {
        cfg.static_dir = Some(dir);
    }

    let (engine, engine_jh) = start_engine(&cfg);

    // HTTP (WebSocket) server
    let ws_addr: SocketAddr = cfg.http_addr.parse()?;
    let ws_jh = tokio::spawn(async move {
        tracing::info!(%ws_addr, "zonemeet WS (http) listening");
        if let Err(e) = http::serve(ws_addr, engine, &cfg).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    // Both only end on error or shutdown
    if let Err(e) = tokio::try_join!(ws_jh, engine_jh) {
        tracing::error!(error = %e, "server task failed");
    }

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, prelude::*};

    color_eyre::install().map_err(|e| anyhow::anyhow!("cannot install color-eyre: {e}"))?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info,zonemeet=debug"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::uptime()),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();

    Ok(())
}
