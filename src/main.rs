use std::{process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use surge::{
    config::{AppConfig, ConfigurationError, Credentials},
    notification::TelegramNotifier,
    providers::WebSocketConnector,
    supervisor::Supervisor,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connects to the chat stream and alerts on bursts until interrupted.
    Run {
        /// Directory containing `app.yaml`.
        #[arg(long)]
        config_dir: Option<String>,
    },
    /// Loads and validates the configuration, then exits.
    CheckConfig {
        /// Directory containing `app.yaml`.
        #[arg(long)]
        config_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {e}");
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config_dir } => run(config_dir.as_deref()).await,
        Commands::CheckConfig { config_dir } => check_config(config_dir.as_deref()),
    }
}

fn load(config_dir: Option<&str>) -> Result<(AppConfig, Credentials), ConfigurationError> {
    tracing::debug!(config_dir = ?config_dir, "Loading application configuration...");
    let config = AppConfig::new(config_dir)?;
    let credentials = Credentials::from_env()?;
    Ok((config, credentials))
}

fn check_config(config_dir: Option<&str>) -> ExitCode {
    match load(config_dir) {
        Ok((config, credentials)) => {
            tracing::info!(config = ?config, credentials = ?credentials, "Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(2)
        }
    }
}

async fn run(config_dir: Option<&str>) -> ExitCode {
    let (config, credentials) = match load(config_dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(2);
        }
    };

    tracing::info!("Chat burst monitor starting.");
    tracing::info!(url = %config.ws_url, "Stream endpoint");
    tracing::info!(
        "Spike threshold: {} msg/min (normal: {} msg/min)",
        config.spike_threshold_per_minute,
        config.normal_rate_per_minute
    );
    tracing::info!("Rate window: {:?}", config.window);
    tracing::info!("Target identity: {}", config.target_identity);
    tracing::info!("Keywords: {}", config.keywords.join(", "));
    tracing::info!("Alert cooldown: {:?}", config.cooldown);

    let notifier = match TelegramNotifier::from_config(&config, &credentials) {
        Ok(notifier) => notifier,
        Err(e) => {
            tracing::error!("Failed to initialize notifier: {e}");
            return ExitCode::FAILURE;
        }
    };
    let connector = WebSocketConnector::new(&config);

    let supervisor = match Supervisor::builder()
        .config(config)
        .connector(Arc::new(connector))
        .notification_sink(Arc::new(notifier))
        .build()
    {
        Ok(supervisor) => supervisor,
        Err(e) => {
            tracing::error!("Failed to build supervisor: {e}");
            return ExitCode::FAILURE;
        }
    };

    match supervisor.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Supervisor failed: {e}");
            ExitCode::FAILURE
        }
    }
}
