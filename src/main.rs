// src/main.rs

//! # Boarding Pass Service - Main Entry Point
//!
//! Loads the configuration, wires the stores, the verifier client and the
//! orchestrator together and starts the API server.
//!
//! ```text
//! boarding-pass --config ./config.json
//! ```
//!
//! Any configuration value can be overridden through the environment, e.g.
//! `BOARDING_PASS__SERVER_CONFIG__PORT=9090`. Log verbosity follows `RUST_LOG`.

use anyhow::Context;
use boarding_pass::config::AppConfig;
use boarding_pass::services::api_server::ApiServer;
use boarding_pass::services::orchestrator::SessionOrchestrator;
use boarding_pass::services::verifier::VerifierClient;
use boarding_pass::storage::session_tracker::SessionTracker;
use boarding_pass::storage::ticket_store::TicketStore;
use boarding_pass::storage::token_storage::token_storage_from_config;
use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "boarding-pass", version, about = "Passport-verified boarding pass issuance")]
struct Cli {
    /// Path for the config.json to use
    #[arg(long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::info!("using config: {}", cli.config.display());

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to read config file {}", cli.config.display()))?;

    let token_storage = token_storage_from_config(&config.storage_config)
        .await
        .context("failed to initialise token storage")?;

    let timeout = Duration::from_secs(config.server_config.request_timeout_secs);
    let verifier = VerifierClient::new(&config.credential_config.irma_server_url, timeout)
        .context("failed to build verifier client")?;
    log::info!("using verifier at {}", verifier.base_url());

    let orchestrator = SessionOrchestrator::new(
        Arc::new(TicketStore::new()),
        token_storage,
        Arc::new(SessionTracker::new()),
        verifier,
        config.credential_config.clone(),
    );

    let addr: SocketAddr = format!("{}:{}", config.server_config.host, config.server_config.port)
        .parse()
        .context("invalid server host/port")?;

    let api_server = ApiServer::new(Arc::new(orchestrator), config.server_config.clone());
    api_server.run(addr).await.context("server failed")?;
    Ok(())
}
