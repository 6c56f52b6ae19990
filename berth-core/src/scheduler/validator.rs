use serde::{Deserialize, Serialize};

use crate::error::BerthResult;
use crate::types::{ClusterCapacity, PlacementStrategy, ResourceVector, VmDemand};

use super::PlacementEngine;

/// Utilization snapshot for one cluster, ratios in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterUtilization {
    pub cluster_id: String,
    pub cluster_name: String,
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
    pub storage_utilization: f64,
}

/// Answer to "could these VMs fit into these clusters at all".
///
/// `shortfall` is the extra capacity per dimension an infeasible request
/// would need in aggregate; `unplaceable` lists VMs that fail even though
/// aggregate capacity suffices (per-cluster fragmentation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityReport {
    pub feasible: bool,
    pub shortfall: ResourceVector,
    pub unplaceable: Vec<String>,
    pub per_cluster: Vec<ClusterUtilization>,
}

fn utilization_rows(clusters: &[ClusterCapacity]) -> Vec<ClusterUtilization> {
    clusters
        .iter()
        .map(|c| ClusterUtilization {
            cluster_id: c.id.clone(),
            cluster_name: c.name.clone(),
            cpu_utilization: c.cpu_utilization(),
            memory_utilization: c.memory_utilization(),
            storage_utilization: c.storage_utilization(),
        })
        .collect()
}

impl PlacementEngine {
    /// Dry-run feasibility check. Two phases: a cheap aggregate comparison
    /// of summed demand against summed available capacity, then a
    /// best-effort balanced placement only when the aggregate check passes,
    /// to catch fragmentation the sums cannot see. Never mutates caller
    /// state and commits nothing.
    pub fn validate(
        &self,
        vms: &[VmDemand],
        clusters: &[ClusterCapacity],
    ) -> BerthResult<FeasibilityReport> {
        for cluster in clusters {
            cluster.validate()?;
        }

        let demand: ResourceVector = vms.iter().map(|vm| vm.resources).sum();
        let available: ResourceVector = clusters.iter().map(|c| c.available).sum();
        let shortfall = demand.saturating_sub(&available);

        if !shortfall.is_zero() {
            tracing::debug!(%shortfall, "aggregate capacity check failed");
            return Ok(FeasibilityReport {
                feasible: false,
                shortfall,
                unplaceable: Vec::new(),
                per_cluster: utilization_rows(clusters),
            });
        }

        if clusters.is_empty() {
            // Nothing to place on; only an empty VM set is feasible.
            return Ok(FeasibilityReport {
                feasible: vms.is_empty(),
                shortfall,
                unplaceable: vms.iter().map(|vm| vm.id.clone()).collect(),
                per_cluster: Vec::new(),
            });
        }

        let result = self.calculate(vms, clusters, PlacementStrategy::Balanced, None)?;
        let unplaceable: Vec<String> = result.unplaced.iter().map(|u| u.vm_id.clone()).collect();
        Ok(FeasibilityReport {
            feasible: unplaceable.is_empty(),
            shortfall,
            unplaceable,
            per_cluster: utilization_rows(&result.clusters),
        })
    }
}
