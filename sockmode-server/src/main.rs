//! Sockmode Server
//!
//! A Slack app that receives events over Socket Mode and dispatches them to
//! concurrently running handlers.

mod config;
mod controllers;
mod shutdown;
mod transport;
mod views;

use clap::Parser;
use config::ConfigLoader;
use shutdown::spawn_shutdown_handler;
use sockmode_core::events::inbound_channel;
use sockmode_core::transport::DecodeOptions;
use sockmode_core::{Dispatcher, RegistryBuilder};
use sockmode_sdk::client::WebClient;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use transport::{AckSlot, ConnectionLoop, SlackResponder};

/// Sockmode - Slack Socket Mode event dispatcher
#[derive(Parser, Debug)]
#[command(name = "sockmode")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./sockmode.toml")]
    config: PathBuf,

    /// Env file providing SLACK_APP_TOKEN and SLACK_BOT_TOKEN
    #[arg(short, long, env = "SOCKMODE_ENV_FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting sockmode v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.env_file);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let credentials = config_loader.credentials().map_err(|e| {
        tracing::error!("Failed to read Slack tokens: {}", e);
        e
    })?;

    // Web API client shared by the connection loop and the handlers
    let client = WebClient::new(credentials.bot_token)?
        .with_app_token(credentials.app_token)
        .with_base_url(loaded_config.slack.api_base_url.clone());

    let (inbound_tx, inbound_rx) = inbound_channel(loaded_config.channel_buffer);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Register handlers, then freeze the registry
    let mut builder = RegistryBuilder::new();
    controllers::register_all(&mut builder, &inbound_tx, Arc::new(client.clone()));
    let registry = builder.build();
    tracing::info!(handlers = registry.len(), "Handler registry built");

    let acks = AckSlot::default();
    let backend = Arc::new(SlackResponder::new(client.clone(), acks.clone()));
    let dispatcher = Dispatcher::new(registry, backend);
    let dispatcher_handle = tokio::spawn(dispatcher.run(shutdown_rx.clone(), inbound_rx));

    let signal_handle = spawn_shutdown_handler(shutdown_tx);

    // Run the connection loop until shutdown
    let connection = ConnectionLoop::new(
        client,
        inbound_tx,
        acks,
        DecodeOptions {
            verification_token: loaded_config.slack.verification_token.clone(),
        },
        loaded_config.reconnect,
    );
    connection.run(shutdown_rx).await;

    if let Err(e) = dispatcher_handle.await {
        tracing::error!("Dispatcher task failed: {}", e);
    }
    signal_handle.abort();

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sockmode_core=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
