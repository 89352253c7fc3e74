//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use invoice_types::{RateCacheStore, RateProvider, SequenceStore};

use super::auth::token_middleware;
use super::handlers::{self, AppState};
use crate::InvoiceProcessor;

/// HTTP Server for the invoice triggers.
pub struct HttpServer<C: RateCacheStore, P: RateProvider, S: SequenceStore> {
    state: Arc<AppState<C, P, S>>,
}

impl<C: RateCacheStore, P: RateProvider, S: SequenceStore> HttpServer<C, P, S> {
    /// Creates a server around an already shared processor state.
    pub fn new(state: Arc<AppState<C, P, S>>) -> Self {
        Self { state }
    }

    pub fn from_processor(processor: InvoiceProcessor<C, P, S>, trigger_token: Option<String>) -> Self {
        Self::new(Arc::new(AppState {
            processor,
            trigger_token: trigger_token.filter(|t| !t.is_empty()),
        }))
    }

    pub fn state(&self) -> Arc<AppState<C, P, S>> {
        self.state.clone()
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/trigger", post(handlers::trigger::<C, P, S>))
            .route("/precache", post(handlers::precache::<C, P, S>))
            .route("/test", get(handlers::test_connections::<C, P, S>))
            .route("/status", get(handlers::status::<C, P, S>))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                token_middleware::<C, P, S>,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
