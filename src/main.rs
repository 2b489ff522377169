use std::{io, net::SocketAddr, path::PathBuf};

use axum_folder_browser::{config, router, ServeConfig};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// --- Configuration ---
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The root directory to serve files from
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    root_dir: PathBuf,

    /// The network address to bind to
    #[arg(short, long, value_name = "ADDR", default_value = "127.0.0.1:8000")]
    bind_addr: SocketAddr,

    /// Show files starting with '.'; asks on stdin when omitted
    #[arg(long, value_name = "BOOL")]
    show_hidden: Option<bool>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let show_hidden = match args.show_hidden {
        Some(show) => show,
        None => config::prompt_show_hidden(io::stdin().lock(), io::stdout()).unwrap_or_else(|e| {
            warn!("Could not read answer, hiding hidden files: {}", e);
            false
        }),
    };

    let config = match ServeConfig::new(&args.root_dir, show_hidden) {
        Ok(config) => config,
        Err(e) => {
            error!(
                "Failed to resolve root directory '{}': {}. Exiting.",
                args.root_dir.display(),
                e
            );
            eprintln!(
                "Error: Failed to resolve root directory '{}': {}",
                args.root_dir.display(),
                e
            );
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(args.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to address {}: {}", args.bind_addr, e);
            eprintln!("Error: Failed to bind to address {}: {}", args.bind_addr, e);
            std::process::exit(1);
        }
    };

    info!("Server: http://{}/", args.bind_addr);
    info!("Root: {}", config.root().display());
    let hidden = if config.visibility().show_hidden() { "Yes" } else { "No" };
    info!("Hidden: {}", hidden);
    info!("Ctrl-C to stop");

    let app = router(config);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
    info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
