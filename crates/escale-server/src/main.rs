//! Escale Server — application entry point.

use escale_core::catalog::ModuleCatalog;
use escale_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // .env is optional; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("escale=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Escale server...");

    let config = DbConfig::from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(e) = escale_db::run_migrations(manager.client()).await {
        tracing::error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }

    let catalog = ModuleCatalog::builtin();
    tracing::info!(modules = catalog.modules().count(), "Module catalog loaded");

    // TODO: mount the REST API once the HTTP layer lands.

    tracing::info!("Escale server stopped.");
}
