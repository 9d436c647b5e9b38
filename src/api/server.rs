use std::net::SocketAddr;

use axum::{Router, middleware::from_fn_with_state, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::{
    services::{echo_body, echo_files, health, upload_form, upload_summary},
    state::AppState,
};
use crate::config::Config;
use crate::middleware::process;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Demo router with the form middleware applied to every route.
pub fn router(state: AppState) -> Router {
    let options = state.options.clone();

    Router::new()
        .route("/", get(upload_form).post(upload_summary))
        .route("/body", post(echo_body))
        .route("/files", post(echo_files))
        .route("/health", get(health))
        .with_state(state)
        .layer(from_fn_with_state(options, process))
        // Runs before the form middleware so gzip-encoded multipart bodies
        // reach the parser decompressed
        .layer(RequestDecompressionLayer::new())
}

pub async fn run(address: SocketAddr, config: Config) -> Result<(), AnyError> {
    let upload_dir = config.upload.to_upload_limits().upload_dir;
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| format!("Failed to create upload dir {}: {}", upload_dir.display(), e))?;

    info!(
        upload_dir = %upload_dir.display(),
        max_file_size = %config.upload.max_file_size,
        max_files_size = %config.upload.max_files_size,
        delete_on_finish = ?config.upload.delete_on_finish,
        "Upload settings"
    );

    let app = router(AppState::new(&config));

    let listener = TcpListener::bind(address).await?;
    info!(%address, "formtree listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
