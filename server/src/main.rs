#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code; a bad setting must end in a clean exit.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;

use webapp::config::ServerConfig;
use webapp::configuration::Configuration;
use webapp::{Startup, mvc};

#[tokio::main]
async fn main() {
    // Load host settings from environment variables. The logger does not
    // exist yet, so failures go to stderr.
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let configuration = match Configuration::from_env() {
        Ok(configuration) => configuration,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let services = match Startup::new(configuration).configure_services() {
        Ok(services) => services,
        Err(e) => {
            eprintln!("Failed to configure services: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = services.logger.install() {
        eprintln!("Failed to install logger: {e}");
        std::process::exit(1);
    }

    tracing::info!(
        "Loaded configuration: environment={}, listen_port={}, https_port={}",
        config.environment,
        config.listen_port,
        config.https_port
    );

    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    let routes = mvc::router(std::sync::Arc::clone(&services.authentication));
    let app = Startup::configure(
        &services,
        routes,
        &config.environment,
        Some(config.https_port),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}
