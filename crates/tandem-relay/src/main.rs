//! tandem-relay: WebSocket rendezvous and chat relay.
//!
//! Pairs two clients per room, forwards their call handshake untouched and
//! persists chat before delivering it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tandem_relay::{serve, ServerContext};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "tandem-relay", about = "Rendezvous and chat relay for two-party rooms")]
struct Args {
    /// Config file. Defaults to the platform config dir.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overriding `server.port`.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match tandem_config::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tandem-relay: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = u32::from(port);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter().into()),
        )
        .init();

    let store = match tandem_store::open_store(&config.store, &config.chat).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open message store");
            return ExitCode::FAILURE;
        }
    };

    let ctx = match ServerContext::new(store, &config) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "Invalid room configuration");
            return ExitCode::FAILURE;
        }
    };

    let addr = config.server.bind_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind TCP listener");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        _ = serve(listener, ctx) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }
    ExitCode::SUCCESS
}
