//! Host allocation REST endpoints.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::api::schemas::{
    BulkAllocationRequest, BulkAllocationResponse, ErrorResponse, TimelineQuery,
};
use crate::booking::HostTimeline;

use super::{check_limit, handle_core_error, AppState};

/// Book a set of hosts for one activity over one window. Each host is
/// validated independently, so the caller gets partial success instead of
/// retrying the whole batch.
pub async fn bulk_allocate(
    Extension(state): Extension<AppState>,
    Json(request): Json<BulkAllocationRequest>,
) -> Result<Json<BulkAllocationResponse>, (StatusCode, Json<ErrorResponse>)> {
    check_limit(
        "host_ids",
        request.host_ids.len(),
        state.limits.max_hosts_per_request,
    )?;

    let results = state
        .ledger
        .bulk_allocate(
            &request.host_ids,
            &request.activity_id,
            request.start,
            request.end,
        )
        .map_err(handle_core_error)?;
    let booked = results.iter().filter(|r| r.success).count();
    Ok(Json(BulkAllocationResponse {
        booked,
        conflicted: results.len() - booked,
        results,
    }))
}

/// Delete one booking by id.
pub async fn remove_allocation(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state
        .ledger
        .remove_allocation(booking_id)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(handle_core_error)
}

/// Sorted bookings plus free-since / next-reservation for one host.
pub async fn host_timeline(
    Extension(state): Extension<AppState>,
    Path(host_id): Path<String>,
    Query(params): Query<TimelineQuery>,
) -> Json<HostTimeline> {
    let as_of = params.as_of.unwrap_or_else(chrono::Utc::now);
    Json(state.ledger.host_timeline(&host_id, as_of))
}
