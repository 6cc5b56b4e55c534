//! Application builder and server lifecycle.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use miniblog_auth::{PolicyEngine, PolicyModel, TokenService};
use miniblog_core::config::{AppConfig, CorsConfig, PolicyConfig};
use miniblog_core::error::AppError;
use miniblog_core::traits::PolicyAdapter;
use miniblog_database::DatabasePool;
use miniblog_database::migration::run_migrations;
use miniblog_database::repositories::policy::PolicyRepository;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState, cors_config: &CorsConfig) -> Router {
    build_router(state)
        .layer(build_cors_layer(cors_config))
        .layer(TraceLayer::new_for_http())
}

/// Loads the policy engine from the durable store using the configured model.
pub async fn load_policy_engine(
    config: &PolicyConfig,
    adapter: Arc<dyn PolicyAdapter>,
) -> Result<PolicyEngine, AppError> {
    let model = match &config.model_path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                AppError::configuration(format!("Failed to read policy model '{path}': {e}"))
            })?;
            PolicyModel::from_text(&text).await?
        }
        None => PolicyModel::acl(),
    };
    Ok(PolicyEngine::load(model, adapter).await?)
}

/// Runs the Miniblog server until a shutdown signal arrives.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    info!("Starting Miniblog server...");

    let db = DatabasePool::connect(&config.database).await?;
    run_migrations(db.pool()).await?;

    let tokens = Arc::new(TokenService::from_config(&config.auth)?);

    let adapter = Arc::new(PolicyRepository::new(db.pool().clone()));
    let policy = Arc::new(load_policy_engine(&config.policy, adapter).await?);

    let (reload_tx, reload_rx) = watch::channel(false);
    let reload_handle = policy.start_auto_reload(
        Duration::from_secs(config.policy.reload_interval_seconds),
        reload_rx,
    );

    let addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let app = build_app(
        AppState::new(config.clone(), db.clone(), tokens, policy),
        &config.server.cors,
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    info!("Miniblog server listening on {}", addr);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.wait_for(|stop| *stop).await;
            })
            .into_future(),
    );

    let served = tokio::select! {
        result = &mut server => result,
        () = shutdown_signal() => {
            info!(grace_secs = grace.as_secs(), "Shutdown signal received, draining requests...");
            let _ = stop_tx.send(true);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Grace period elapsed with requests still in flight");
                    server.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    let _ = reload_tx.send(true);
    if let Err(e) = reload_handle.await {
        error!(error = %e, "Policy reload task ended abnormally");
    }
    db.close().await;

    match served {
        Ok(Ok(())) => {
            info!("Miniblog server shut down gracefully");
            Ok(())
        }
        Ok(Err(e)) => Err(AppError::internal(format!("Server error: {e}"))),
        Err(e) => Err(AppError::internal(format!("Server task failed: {e}"))),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
