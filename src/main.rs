//! SiteWatch - Website Availability Monitor
//!
//! Periodically probes registered websites and records whether each is
//! reachable, with a small REST API for managing the monitored set.

mod config;
mod db;
mod probe;
mod scheduler;
mod web;

#[cfg(test)]
mod testing;

use config::ServerConfig;
use db::{Store, TargetRepository};
use probe::{HttpProber, Prober};
use scheduler::Scheduler;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("sitewatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting SiteWatch on port {}...", cfg.http_port);
    tracing::info!("Using database at {}", cfg.db_path);
    tracing::info!(
        interval_secs = cfg.check_interval.as_secs(),
        timeout_secs = cfg.probe_timeout.as_secs(),
        workers = cfg.max_concurrent_probes,
        "Monitor settings"
    );

    // Initialize database
    let store = Store::new(&cfg.db_path)?;
    tracing::info!("Database initialized successfully");

    // Create scheduler
    let prober = Arc::new(HttpProber::new(cfg.probe_timeout, cfg.probe_jitter)?);
    let scheduler = Arc::new(Scheduler::new(
        Arc::new(store.clone()) as Arc<dyn TargetRepository>,
        prober as Arc<dyn Prober>,
        &cfg,
    ));

    // Start scheduler
    scheduler.start().await;

    // Start web server
    let server = Server::new(cfg, store, scheduler.clone());
    let served = server.start(shutdown_signal()).await;

    tracing::info!("Shutting down scheduler");
    scheduler.stop().await;

    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
