//! REST endpoints for placement computation and host allocation.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::schemas::ErrorResponse;
use crate::booking::BookingLedger;
use crate::error::BerthError;

pub mod allocation;
pub mod health;
pub mod placement;

/// Input-size ceilings enforced before any computation runs; requests are
/// expected to complete in bounded time given bounded size, so there is no
/// in-flight cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLimits {
    pub max_vms: usize,
    pub max_clusters: usize,
    pub max_hosts_per_request: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_vms: 1000,
            max_clusters: 200,
            max_hosts_per_request: 500,
        }
    }
}

/// Application state for REST endpoints.
#[derive(Clone)]
pub struct AppState {
    /// Live booking state; placement endpoints are stateless.
    pub ledger: Arc<BookingLedger>,
    pub limits: RequestLimits,
}

/// Create the main REST API router.
pub fn create_api_router(ledger: Arc<BookingLedger>, limits: RequestLimits) -> Router {
    let app_state = AppState { ledger, limits };

    Router::new()
        .route("/placement/calculate", post(placement::calculate))
        .route("/placement/validate", post(placement::validate))
        .route("/placement/optimize/:request_id", post(placement::optimize))
        .route("/placement/manual", post(placement::manual))
        .route("/allocations", post(allocation::bulk_allocate))
        .route("/allocations/:booking_id", delete(allocation::remove_allocation))
        .route("/hosts/:host_id/timeline", get(allocation::host_timeline))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(Extension(app_state)),
        )
}

/// Helper function to create JSON error responses.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    let error = ErrorResponse {
        code: status.as_u16(),
        error: status.canonical_reason().unwrap_or("Unknown").to_string(),
        message: message.into(),
        timestamp: chrono::Utc::now(),
    };
    (status, Json(error))
}

/// Maps core errors to HTTP responses. Soft outcomes (unplaced VMs,
/// per-host conflicts) never reach this path; they are encoded as data in
/// 200 responses.
pub fn handle_core_error(error: BerthError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &error {
        BerthError::NotFound { .. } => StatusCode::NOT_FOUND,
        BerthError::InvalidInput { .. } | BerthError::InvalidInterval { .. } => {
            StatusCode::BAD_REQUEST
        }
        BerthError::NoClustersAvailable => StatusCode::UNPROCESSABLE_ENTITY,
        BerthError::InsufficientResources { .. } => StatusCode::CONFLICT,
        BerthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, error.to_string())
}

/// Rejects a request whose collection exceeds the configured ceiling.
pub(crate) fn check_limit(
    field: &str,
    len: usize,
    limit: usize,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if len > limit {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            format!("{field} count {len} exceeds the limit of {limit}"),
        ));
    }
    Ok(())
}
