//! REST API server implementation.

use std::{net::SocketAddr, sync::Arc};

use axum::{routing::get, Router};

use crate::booking::BookingLedger;
use crate::error::{BerthError, BerthResult};

use super::rest::{self, RequestLimits};

/// REST API server configuration.
#[derive(Debug, Clone)]
pub struct RestApiConfig {
    /// Bind address for the REST API server.
    pub bind_address: SocketAddr,
    /// Input-size ceilings applied per request.
    pub limits: RequestLimits,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:7410".parse().unwrap(),
            limits: RequestLimits::default(),
        }
    }
}

/// REST API server owning the live booking ledger.
pub struct RestApiServer {
    config: RestApiConfig,
    ledger: Arc<BookingLedger>,
}

impl RestApiServer {
    pub fn new(config: RestApiConfig) -> Self {
        Self {
            config,
            ledger: Arc::new(BookingLedger::new()),
        }
    }

    /// Shares a ledger created elsewhere, e.g. between tests and handlers.
    pub fn with_ledger(config: RestApiConfig, ledger: Arc<BookingLedger>) -> Self {
        Self { config, ledger }
    }

    /// Create the main application router.
    pub fn create_router(&self) -> Router {
        Router::new()
            .nest(
                "/api/v1",
                rest::create_api_router(self.ledger.clone(), self.config.limits),
            )
            .route("/health", get(rest::health::health_check))
    }

    /// Start the REST API server.
    pub async fn serve(self) -> BerthResult<()> {
        let router = self.create_router();

        tracing::info!("starting REST API server on {}", self.config.bind_address);

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(|e| BerthError::Internal {
                message: format!("failed to bind to {}: {}", self.config.bind_address, e),
            })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| BerthError::Internal {
                message: format!("REST API server error: {e}"),
            })?;

        Ok(())
    }

    /// Start the server in a background task.
    pub fn spawn(self) -> tokio::task::JoinHandle<BerthResult<()>> {
        tokio::spawn(async move { self.serve().await })
    }
}
