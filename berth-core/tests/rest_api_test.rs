//! End-to-end tests for the REST API router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use berth_core::api::rest::RequestLimits;
use berth_core::api::server::{RestApiConfig, RestApiServer};
use berth_core::booking::BookingLedger;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_router() -> Router {
    RestApiServer::new(RestApiConfig::default()).create_router()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn sample_clusters() -> Value {
    json!([
        {
            "id": "c1",
            "name": "Cluster 1",
            "total": { "cpu_cores": 16, "memory_gb": 64, "storage_gb": 500 },
            "available": { "cpu_cores": 16, "memory_gb": 64, "storage_gb": 500 }
        },
        {
            "id": "c2",
            "name": "Cluster 2",
            "total": { "cpu_cores": 16, "memory_gb": 64, "storage_gb": 500 },
            "available": { "cpu_cores": 16, "memory_gb": 64, "storage_gb": 500 }
        }
    ])
}

#[tokio::test]
async fn health_endpoint_responds() {
    let response = test_router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn calculate_reports_unplaced_vms_as_data() {
    let request = post(
        "/api/v1/placement/calculate",
        json!({
            "vms": [
                { "id": "vm-1", "name": "vm-1",
                  "resources": { "cpu_cores": 4, "memory_gb": 16, "storage_gb": 100 } },
                { "id": "vm-huge", "name": "vm-huge",
                  "resources": { "cpu_cores": 99, "memory_gb": 512, "storage_gb": 9000 } }
            ],
            "clusters": sample_clusters(),
            "strategy": "Balanced"
        }),
    );

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["summary"]["placed_vms"], 1);
    assert_eq!(body["unplaced"][0]["vm_id"], "vm-huge");
    assert_eq!(body["unplaced"][0]["reason"], "InsufficientCapacity");
}

#[tokio::test]
async fn calculate_with_no_clusters_is_unprocessable() {
    let request = post(
        "/api/v1/placement/calculate",
        json!({
            "vms": [{ "id": "vm-1", "name": "vm-1",
                      "resources": { "cpu_cores": 1, "memory_gb": 1, "storage_gb": 1 } }],
            "clusters": []
        }),
    );

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn oversized_request_is_rejected_before_computation() {
    let config = RestApiConfig {
        limits: RequestLimits {
            max_vms: 1,
            ..RequestLimits::default()
        },
        ..RestApiConfig::default()
    };
    let router = RestApiServer::new(config).create_router();

    let request = post(
        "/api/v1/placement/calculate",
        json!({
            "vms": [
                { "id": "vm-1", "name": "vm-1",
                  "resources": { "cpu_cores": 1, "memory_gb": 1, "storage_gb": 1 } },
                { "id": "vm-2", "name": "vm-2",
                  "resources": { "cpu_cores": 1, "memory_gb": 1, "storage_gb": 1 } }
            ],
            "clusters": sample_clusters()
        }),
    );

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn validate_reports_shortfall() {
    let request = post(
        "/api/v1/placement/validate",
        json!({
            "vms": [{ "id": "vm-1", "name": "vm-1",
                      "resources": { "cpu_cores": 64, "memory_gb": 512, "storage_gb": 9000 } }],
            "clusters": sample_clusters()
        }),
    );

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["feasible"], false);
    assert_eq!(body["shortfall"]["cpu_cores"], 32);
}

#[tokio::test]
async fn optimize_echoes_the_request_id() {
    let request = post(
        "/api/v1/placement/optimize/req-42",
        json!({
            "vms": [{ "id": "vm-1", "name": "vm-1",
                      "resources": { "cpu_cores": 4, "memory_gb": 16, "storage_gb": 100 } }],
            "clusters": sample_clusters()
        }),
    );

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["request_id"], "req-42");
    assert_eq!(body["result"]["summary"]["placed_vms"], 1);
}

#[tokio::test]
async fn manual_placement_conflict_maps_to_409() {
    let request = post(
        "/api/v1/placement/manual",
        json!({
            "vm": { "id": "vm-1", "name": "vm-1",
                    "resources": { "cpu_cores": 99, "memory_gb": 1, "storage_gb": 1 } },
            "cluster_id": "c1",
            "clusters": sample_clusters()
        }),
    );

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn allocations_round_trip_through_the_ledger() {
    let ledger = Arc::new(BookingLedger::new());
    let server = RestApiServer::with_ledger(RestApiConfig::default(), ledger.clone());

    let request = post(
        "/api/v1/allocations",
        json!({
            "host_ids": ["host-a", "host-b"],
            "activity_id": "commissioning",
            "start": "2025-06-02T09:00:00Z",
            "end": "2025-06-02T17:00:00Z"
        }),
    );
    let response = server.create_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["booked"], 2);
    assert_eq!(body["conflicted"], 0);
    assert_eq!(ledger.len(), 2);

    // Overlapping re-request conflicts on both hosts
    let request = post(
        "/api/v1/allocations",
        json!({
            "host_ids": ["host-a", "host-b"],
            "activity_id": "commissioning",
            "start": "2025-06-02T10:00:00Z",
            "end": "2025-06-02T11:00:00Z"
        }),
    );
    let response = server.create_router().oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["booked"], 0);
    assert_eq!(body["conflicted"], 2);

    let response = server
        .create_router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/hosts/host-a/timeline?as_of=2025-06-02T08:00:00Z")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["bookings"].as_array().unwrap().len(), 1);
    assert_eq!(body["next_reservation"]["start"], "2025-06-02T09:00:00Z");
}

#[tokio::test]
async fn invalid_interval_maps_to_400() {
    let request = post(
        "/api/v1/allocations",
        json!({
            "host_ids": ["host-a"],
            "activity_id": "commissioning",
            "start": "2025-06-02T17:00:00Z",
            "end": "2025-06-02T09:00:00Z"
        }),
    );

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_an_unknown_booking_maps_to_404() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/allocations/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
