use clap::{Parser, Subcommand};
use cox_usaged::{build_fetcher, initial_refresh, spawn_poller, SensorStatusResponse};
use cu_api::rest::health::init_start_time;
use cu_api::{build_router, AppState};
use cu_config::DaemonConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "cox-usaged",
    version = cox_usaged::DAEMON_VERSION,
    about = "Cox data usage sensor daemon"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sensor and its HTTP API in the foreground
    Run {
        /// Port to bind to (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Scrape once and print the sensor as JSON
    Once,
    /// Show the sensor of a running daemon
    Status,
    /// Print version
    Version,
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl+c");
    }
    tracing::info!("Shutting down...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cox_usaged=info,cu_usage=info,cu_api=info,tower_http=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { port } => {
            let mut config = DaemonConfig::load()?;
            if let Some(port) = port {
                config.port = port;
            }

            let fetcher = Arc::new(build_fetcher(&config));
            initial_refresh(&fetcher).await?;
            tracing::info!(
                sensor = %config.name,
                every_secs = config.poll_interval_secs,
                min_refresh_minutes = config.min_refresh_minutes,
                "sensor registered"
            );

            init_start_time();
            let poller = spawn_poller(
                fetcher.clone(),
                Duration::from_secs(config.poll_interval_secs),
            );

            let app = build_router(AppState::new(config.clone(), fetcher));
            let addr: SocketAddr = config.bind_addr().parse()?;
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!("Listening on {}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            poller.abort();

            Ok(())
        }

        Commands::Once => {
            let config = DaemonConfig::load()?;
            let fetcher = build_fetcher(&config);
            let outcome = fetcher.refresh_forced().await;
            println!("{}", serde_json::to_string_pretty(&fetcher.snapshot())?);
            if !outcome.is_success() {
                anyhow::bail!("Refresh failed");
            }
            Ok(())
        }

        Commands::Status => {
            let config = DaemonConfig::load()?;
            let url = format!("http://{}/api/v1/sensor", config.bind_addr());
            match reqwest::get(&url).await {
                Ok(resp) if resp.status().is_success() => {
                    let body: SensorStatusResponse = resp.json().await?;
                    print!("{}", body.render());
                }
                Ok(resp) => {
                    println!("Daemon answered {} at {}", resp.status(), url);
                }
                Err(_) => {
                    println!("Daemon is not running (could not reach {})", url);
                }
            }
            Ok(())
        }

        Commands::Version => {
            println!("cox-usaged {}", cox_usaged::DAEMON_VERSION);
            Ok(())
        }
    }
}
