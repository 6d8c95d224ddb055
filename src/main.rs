use std::path::PathBuf;

use clap::Parser;

use plan_store::config::{load_config, ServerConfig};
use plan_store::lifecycle::signals;
use plan_store::observability::{logging, metrics};
use plan_store::session::credentials::hash_password;
use plan_store::{Application, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "plan-store", version, about = "Durable plan storage over HTTP")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "PLAN_STORE_CONFIG")]
    config: Option<PathBuf>,

    /// Print an Argon2 hash of PASSWORD for the `[[users]]` table and exit.
    #[arg(long, value_name = "PASSWORD")]
    hash_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(password) = cli.hash_password {
        println!("{}", hash_password(&password).map_err(|e| e.to_string())?);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "plan-store starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        data_dir = %config.storage.data_dir.display(),
        users = config.users.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Application::build(&config).await?;
    tracing::info!(address = %app.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let running = app.run(&shutdown);
    signals::forward_to(shutdown);
    running.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
