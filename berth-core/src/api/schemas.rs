//! Request and response bodies for the REST API.
//!
//! Domain types already carry serde derives, so the wire format reuses
//! them directly; the structs here only shape the request envelopes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::HostAllocationOutcome;
use crate::capacity::OversubscriptionPolicy;
use crate::scheduler::{OptimizeReport, PlacementAssignment, PlacementResult};
use crate::types::{ClusterCapacity, PlacementStrategy, VmDemand};

#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    pub vms: Vec<VmDemand>,
    pub clusters: Vec<ClusterCapacity>,
    #[serde(default)]
    pub strategy: PlacementStrategy,
    #[serde(default)]
    pub oversubscription: Option<OversubscriptionPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequest {
    pub vms: Vec<VmDemand>,
    pub clusters: Vec<ClusterCapacity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizeRequest {
    pub vms: Vec<VmDemand>,
    pub clusters: Vec<ClusterCapacity>,
    #[serde(default)]
    pub strategy: PlacementStrategy,
    #[serde(default)]
    pub oversubscription: Option<OversubscriptionPolicy>,
    /// Move ceiling override; defaults to twice the VM count.
    #[serde(default)]
    pub max_moves: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResponse {
    pub request_id: String,
    pub result: PlacementResult,
    pub report: OptimizeReport,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualPlacementRequest {
    pub vm: VmDemand,
    pub cluster_id: String,
    pub clusters: Vec<ClusterCapacity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualPlacementResponse {
    pub assignment: PlacementAssignment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkAllocationRequest {
    pub host_ids: Vec<String>,
    pub activity_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkAllocationResponse {
    pub booked: usize,
    pub conflicted: usize,
    pub results: Vec<HostAllocationOutcome>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineQuery {
    /// Reference instant; defaults to now.
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
