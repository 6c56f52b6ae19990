//! Placement REST endpoints.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};

use crate::api::schemas::{
    CalculateRequest, ErrorResponse, ManualPlacementRequest, ManualPlacementResponse,
    OptimizeRequest, OptimizeResponse, ValidateRequest,
};
use crate::scheduler::{FeasibilityReport, Optimizer, PlacementEngine, PlacementResult};

use super::{check_limit, handle_core_error, AppState};

/// Compute a full placement for the supplied VM and cluster snapshot.
/// Unplaced VMs are part of a successful response, not an error.
pub async fn calculate(
    Extension(state): Extension<AppState>,
    Json(request): Json<CalculateRequest>,
) -> Result<Json<PlacementResult>, (StatusCode, Json<ErrorResponse>)> {
    check_limit("vms", request.vms.len(), state.limits.max_vms)?;
    check_limit("clusters", request.clusters.len(), state.limits.max_clusters)?;

    PlacementEngine::new()
        .calculate(
            &request.vms,
            &request.clusters,
            request.strategy,
            request.oversubscription.as_ref(),
        )
        .map(Json)
        .map_err(handle_core_error)
}

/// Dry-run feasibility pre-check, used before committing a multi-host
/// order from the wizard flow.
pub async fn validate(
    Extension(state): Extension<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<FeasibilityReport>, (StatusCode, Json<ErrorResponse>)> {
    check_limit("vms", request.vms.len(), state.limits.max_vms)?;
    check_limit("clusters", request.clusters.len(), state.limits.max_clusters)?;

    PlacementEngine::new()
        .validate(&request.vms, &request.clusters)
        .map(Json)
        .map_err(handle_core_error)
}

/// Re-run calculate and refine the result with the rebalancing pass.
pub async fn optimize(
    Extension(state): Extension<AppState>,
    Path(request_id): Path<String>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, (StatusCode, Json<ErrorResponse>)> {
    check_limit("vms", request.vms.len(), state.limits.max_vms)?;
    check_limit("clusters", request.clusters.len(), state.limits.max_clusters)?;

    let engine = PlacementEngine::new();
    let result = engine
        .calculate(
            &request.vms,
            &request.clusters,
            request.strategy,
            request.oversubscription.as_ref(),
        )
        .map_err(handle_core_error)?;
    let outcome = Optimizer::new(request.max_moves)
        .optimize(result, &request.vms)
        .map_err(handle_core_error)?;

    Ok(Json(OptimizeResponse {
        request_id,
        result: outcome.result,
        report: outcome.report,
    }))
}

/// User override: pin one VM to one chosen cluster.
pub async fn manual(
    Extension(state): Extension<AppState>,
    Json(request): Json<ManualPlacementRequest>,
) -> Result<Json<ManualPlacementResponse>, (StatusCode, Json<ErrorResponse>)> {
    check_limit("clusters", request.clusters.len(), state.limits.max_clusters)?;

    PlacementEngine::new()
        .place_manual(&request.vm, &request.cluster_id, &request.clusters)
        .map(|assignment| Json(ManualPlacementResponse { assignment }))
        .map_err(handle_core_error)
}
