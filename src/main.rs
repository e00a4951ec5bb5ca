use anyhow::Context;
use anyhow::Result;
use dst_amend::config::Config;
use dst_amend::server;
use dst_amend::server::AppState;
use dst_amend::storage::DriveClient;
use dst_amend::storage::ServiceAccountKey;
use dst_amend::workflow::Workflow;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let key = ServiceAccountKey::from_json(&config.service_account)
        .context("Failed to parse the service account key")?;
    let client_email = key.client_email.to_owned();
    let store = DriveClient::new(key, config.http_timeout).context("Failed to create the Google Drive client")?;
    let workflow = Workflow::new(Arc::new(store), config.folders.clone());
    let app = server::router(AppState::new(workflow), config.max_upload_bytes);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        address = %config.bind,
        service_account = %client_email,
        original_folder = %config.folders.original,
        amended_folder = %config.folders.amended,
        "DST amendment tool listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server stopped unexpectedly")?;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
