//! VM placement across destination clusters.
//!
//! Split into focused submodules in the same shape as the capacity model:
//! - `strategies`: per-VM cluster selection for each placement strategy
//! - `validator`: dry-run feasibility checks without committing a placement
//! - `optimizer`: bounded local-search refinement of a completed placement

pub mod optimizer;
pub mod strategies;
pub mod validator;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::capacity::OversubscriptionPolicy;
use crate::error::{BerthError, BerthResult};
use crate::types::{ClusterCapacity, PlacementStrategy, ResourceVector, VmDemand};

pub use optimizer::{MoveRecord, OptimizeOutcome, OptimizeReport, Optimizer};
pub use validator::{ClusterUtilization, FeasibilityReport};

/// One VM assigned to one cluster, with the rule that decided it and the
/// capacity left on the cluster once the assignment was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementAssignment {
    pub vm_id: String,
    pub vm_name: String,
    pub cluster_id: String,
    pub cluster_name: String,
    pub decided_by: String,
    pub residual: ResourceVector,
}

/// Why a VM could not be assigned. Unplaced VMs are a normal outcome, not
/// an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnplacedReason {
    InsufficientCapacity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnplacedVm {
    pub vm_id: String,
    pub vm_name: String,
    pub reason: UnplacedReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSummary {
    pub total_vms: usize,
    pub placed_vms: usize,
    pub unplaced_vms: usize,
    pub clusters_used: usize,
    pub average_peak_utilization: f64,
    pub strategy: PlacementStrategy,
}

/// Full result of one placement computation: assignments, explicitly
/// reported unplaced VMs, and the residual capacity view of every cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementResult {
    pub assignments: Vec<PlacementAssignment>,
    pub unplaced: Vec<UnplacedVm>,
    pub clusters: Vec<ClusterCapacity>,
    pub warnings: Vec<String>,
    pub summary: PlacementSummary,
}

/// Placement engine. Pure and synchronous: operates on a cloned snapshot
/// of the caller's clusters and never mutates its inputs.
#[derive(Debug, Default)]
pub struct PlacementEngine;

impl PlacementEngine {
    pub fn new() -> Self {
        Self
    }

    /// Assigns every VM to a cluster or marks it unplaceable, according to
    /// the chosen strategy. Deterministic for fixed inputs: ties are broken
    /// by ascending identifier, never by insertion order alone.
    pub fn calculate(
        &self,
        vms: &[VmDemand],
        clusters: &[ClusterCapacity],
        strategy: PlacementStrategy,
        oversubscription: Option<&OversubscriptionPolicy>,
    ) -> BerthResult<PlacementResult> {
        for cluster in clusters {
            cluster.validate()?;
        }
        let mut working: Vec<ClusterCapacity> = match oversubscription {
            Some(policy) => {
                policy.validate()?;
                clusters.iter().map(|c| policy.apply(c)).collect()
            }
            None => clusters.to_vec(),
        };

        if vms.is_empty() {
            return Ok(Self::assemble(Vec::new(), Vec::new(), working, Vec::new(), 0, strategy));
        }
        if working.is_empty() {
            return Err(BerthError::NoClustersAvailable);
        }

        tracing::info!(
            vm_count = vms.len(),
            cluster_count = working.len(),
            ?strategy,
            "computing placement"
        );

        let mut assignments = Vec::new();
        let mut unplaced = Vec::new();
        let mut warnings = Vec::new();
        let mut critical_hosts: HashSet<String> = HashSet::new();

        for vm in Self::priority_order(vms) {
            match self.select_cluster(strategy, &vm, &working, &critical_hosts) {
                Some((idx, rule)) => {
                    working[idx].reserve(&vm.resources)?;
                    if vm.critical {
                        critical_hosts.insert(working[idx].id.clone());
                    }
                    tracing::debug!(vm = %vm.id, cluster = %working[idx].id, rule, "placed");
                    assignments.push(PlacementAssignment {
                        vm_id: vm.id.clone(),
                        vm_name: vm.name.clone(),
                        cluster_id: working[idx].id.clone(),
                        cluster_name: working[idx].name.clone(),
                        decided_by: rule.to_string(),
                        residual: working[idx].available,
                    });
                }
                None => {
                    warnings.push(format!(
                        "Unable to place VM '{}' ({}): insufficient cluster capacity",
                        vm.name, vm.resources
                    ));
                    unplaced.push(UnplacedVm {
                        vm_id: vm.id.clone(),
                        vm_name: vm.name.clone(),
                        reason: UnplacedReason::InsufficientCapacity,
                    });
                }
            }
        }

        tracing::info!(
            placed = assignments.len(),
            unplaced = unplaced.len(),
            "placement complete"
        );
        Ok(Self::assemble(assignments, unplaced, working, warnings, vms.len(), strategy))
    }

    /// User override: pin one VM to one chosen cluster, validating that it
    /// actually fits there.
    pub fn place_manual(
        &self,
        vm: &VmDemand,
        cluster_id: &str,
        clusters: &[ClusterCapacity],
    ) -> BerthResult<PlacementAssignment> {
        for cluster in clusters {
            cluster.validate()?;
        }
        let cluster = clusters
            .iter()
            .find(|c| c.id == cluster_id)
            .ok_or_else(|| BerthError::NotFound {
                resource: format!("cluster {cluster_id}"),
            })?;
        let mut pinned = cluster.clone();
        pinned.reserve(&vm.resources)?;
        tracing::info!(vm = %vm.id, cluster = %pinned.id, "manual placement");
        Ok(PlacementAssignment {
            vm_id: vm.id.clone(),
            vm_name: vm.name.clone(),
            cluster_id: pinned.id.clone(),
            cluster_name: pinned.name.clone(),
            decided_by: "manual".to_string(),
            residual: pinned.available,
        })
    }

    /// Critical VMs first, then descending footprint; ascending id as the
    /// final tie-break so equal-cost orders stay stable.
    fn priority_order(vms: &[VmDemand]) -> Vec<VmDemand> {
        let mut ordered = vms.to_vec();
        ordered.sort_by(|a, b| {
            b.critical
                .cmp(&a.critical)
                .then_with(|| {
                    b.footprint()
                        .partial_cmp(&a.footprint())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        ordered
    }

    fn assemble(
        assignments: Vec<PlacementAssignment>,
        unplaced: Vec<UnplacedVm>,
        clusters: Vec<ClusterCapacity>,
        warnings: Vec<String>,
        total_vms: usize,
        strategy: PlacementStrategy,
    ) -> PlacementResult {
        let used_ids: HashSet<&str> = assignments.iter().map(|a| a.cluster_id.as_str()).collect();
        let used: Vec<&ClusterCapacity> = clusters
            .iter()
            .filter(|c| used_ids.contains(c.id.as_str()))
            .collect();
        let average_peak_utilization = if used.is_empty() {
            0.0
        } else {
            used.iter().map(|c| c.peak_utilization()).sum::<f64>() / used.len() as f64
        };
        let summary = PlacementSummary {
            total_vms,
            placed_vms: assignments.len(),
            unplaced_vms: unplaced.len(),
            clusters_used: used.len(),
            average_peak_utilization,
            strategy,
        };
        PlacementResult {
            assignments,
            unplaced,
            clusters,
            warnings,
            summary,
        }
    }
}
