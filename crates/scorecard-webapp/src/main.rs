use clap::Parser;
use scorecard_core::ServerConfig;
use scorecard_host::run as run_server;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "scorecard-webapp", about = "OpenSSF scorecard results publication service")]
struct Cli {
    /// Port to serve the HTTP API on (overrides $PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %format!("{err:#}"), "server failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }
    run_server(config).await
}
