use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use ospry_demo::api::AppState;
use ospry_demo::config::DemoConfig;
use ospry_demo::store::MemoryMetadataStore;

/// Example web server for the Ospry image-hosting client.
#[derive(Parser, Debug)]
#[command(name = "ospry-demo", about = "Example web server for Ospry")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "ospry-demo.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the secret API key.
    #[arg(long)]
    secret_key: Option<String>,

    /// Override the public API key.
    #[arg(long)]
    public_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does not exist.
    let mut config = DemoConfig::load(Path::new(&cli.config))?;
    config.apply_env(|name| std::env::var(name).ok());

    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(key) = cli.secret_key {
        config.ospry.secret_key = Some(key);
    }
    if let Some(key) = cli.public_key {
        config.ospry.public_key = Some(key);
    }

    ospry_demo::telemetry::init(&config.logging);

    if !Path::new(&cli.config).exists() {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    let (_, public_key) = config.ospry.keys()?;
    let client = config.ospry.client()?;
    let state = AppState::new(
        Arc::new(client),
        Arc::new(MemoryMetadataStore::new()),
        public_key,
        config.ospry.signed_url_ttl()?,
    )?;

    let app = ospry_demo::api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, server_url = %config.ospry.server_url, "ospry-demo listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ospry-demo shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
