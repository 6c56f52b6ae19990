//! Local-search refinement of a completed placement.
//!
//! Hill climbing over single-VM moves: repeatedly apply the best strictly
//! improving reassignment until none remains or the move ceiling is hit.
//! This terminates at a local optimum, not a global one; the ceiling keeps
//! latency bounded on pathological inputs.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::BerthResult;
use crate::types::{ClusterCapacity, VmDemand};

use super::{PlacementAssignment, PlacementEngine, PlacementResult, UnplacedVm};

/// A move only counts as improving if it beats the current objective by
/// more than this, which guards against float noise keeping the loop alive.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub vm_id: String,
    pub from_cluster: String,
    pub to_cluster: String,
    /// Objective value reached after applying this move.
    pub objective: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub moves: Vec<MoveRecord>,
    pub objective_before: f64,
    pub objective_after: f64,
    /// True when the move ceiling stopped the search while an improving
    /// move still existed.
    pub ceiling_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeOutcome {
    pub result: PlacementResult,
    pub report: OptimizeReport,
}

/// Bounded hill-climbing optimizer over the balanced objective: the
/// population variance of per-cluster peak utilization.
#[derive(Debug, Default)]
pub struct Optimizer {
    max_moves: Option<usize>,
}

impl Optimizer {
    /// `max_moves = None` defaults the ceiling to twice the VM count.
    pub fn new(max_moves: Option<usize>) -> Self {
        Self { max_moves }
    }

    pub fn optimize(
        &self,
        result: PlacementResult,
        vms: &[VmDemand],
    ) -> BerthResult<OptimizeOutcome> {
        let vm_by_id: HashMap<&str, &VmDemand> =
            vms.iter().map(|vm| (vm.id.as_str(), vm)).collect();

        let mut clusters = result.clusters.clone();
        let mut placed: Vec<(String, usize)> = {
            let index_of: HashMap<&str, usize> = result
                .clusters
                .iter()
                .enumerate()
                .map(|(idx, c)| (c.id.as_str(), idx))
                .collect();
            result
                .assignments
                .iter()
                .filter_map(|a| {
                    index_of
                        .get(a.cluster_id.as_str())
                        .map(|&idx| (a.vm_id.clone(), idx))
                })
                .collect()
        };
        let mut unplaced = result.unplaced.clone();
        let mut retried: Vec<String> = Vec::new();
        let mut moved: HashSet<String> = HashSet::new();

        let objective_before = Self::objective(&clusters);
        let ceiling = self.max_moves.unwrap_or(2 * vms.len());

        // VMs that missed out in the first pass may fit before any moves at
        // all (e.g. a different snapshot than the one they were tried on).
        Self::retry_unplaced(&mut clusters, &mut placed, &mut unplaced, &mut retried, &vm_by_id)?;

        let mut moves = Vec::new();
        let mut ceiling_hit = false;
        loop {
            if moves.len() >= ceiling {
                ceiling_hit = Self::best_move(&clusters, &placed, &vm_by_id).is_some();
                break;
            }
            let Some((pos, to_idx, objective)) = Self::best_move(&clusters, &placed, &vm_by_id)
            else {
                break;
            };
            let (vm_id, from_idx) = placed[pos].clone();
            let demand = vm_by_id[vm_id.as_str()].resources;
            clusters[from_idx].release(&demand);
            clusters[to_idx].reserve(&demand)?;
            placed[pos].1 = to_idx;
            tracing::debug!(
                vm = %vm_id,
                from = %clusters[from_idx].id,
                to = %clusters[to_idx].id,
                objective,
                "applied rebalancing move"
            );
            moves.push(MoveRecord {
                vm_id: vm_id.clone(),
                from_cluster: clusters[from_idx].id.clone(),
                to_cluster: clusters[to_idx].id.clone(),
                objective,
            });
            moved.insert(vm_id);
        }

        // Moves may have opened up room for VMs that had nowhere to go.
        Self::retry_unplaced(&mut clusters, &mut placed, &mut unplaced, &mut retried, &vm_by_id)?;

        let objective_after = Self::objective(&clusters);
        tracing::info!(
            moves = moves.len(),
            objective_before,
            objective_after,
            ceiling_hit,
            "optimization pass complete"
        );

        let refined = Self::rebuild(result, clusters, &placed, &unplaced, &retried, &moved, &vm_by_id);
        Ok(OptimizeOutcome {
            result: refined,
            report: OptimizeReport {
                moves,
                objective_before,
                objective_after,
                ceiling_hit,
            },
        })
    }

    /// Population variance of per-cluster peak utilization; lower is more
    /// evenly balanced.
    fn objective(clusters: &[ClusterCapacity]) -> f64 {
        Self::variance(clusters.iter().map(|c| c.peak_utilization()))
    }

    fn objective_with(
        clusters: &[ClusterCapacity],
        from_idx: usize,
        from_after: &ClusterCapacity,
        to_idx: usize,
        to_after: &ClusterCapacity,
    ) -> f64 {
        Self::variance(clusters.iter().enumerate().map(|(idx, c)| {
            if idx == from_idx {
                from_after.peak_utilization()
            } else if idx == to_idx {
                to_after.peak_utilization()
            } else {
                c.peak_utilization()
            }
        }))
    }

    fn variance(peaks: impl Iterator<Item = f64> + Clone) -> f64 {
        let count = peaks.clone().count();
        if count == 0 {
            return 0.0;
        }
        let mean = peaks.clone().sum::<f64>() / count as f64;
        peaks.map(|p| (p - mean) * (p - mean)).sum::<f64>() / count as f64
    }

    /// Finds the single best strictly improving move, deterministically:
    /// candidates are scanned in assignment order, then cluster order, and
    /// only a strictly lower objective displaces the incumbent.
    fn best_move(
        clusters: &[ClusterCapacity],
        placed: &[(String, usize)],
        vm_by_id: &HashMap<&str, &VmDemand>,
    ) -> Option<(usize, usize, f64)> {
        let current = Self::objective(clusters);
        let mut best: Option<(f64, usize, usize)> = None;
        for (pos, (vm_id, from_idx)) in placed.iter().enumerate() {
            let Some(vm) = vm_by_id.get(vm_id.as_str()) else {
                continue;
            };
            let demand = vm.resources;
            if demand.is_zero() {
                continue;
            }
            let mut from_after = clusters[*from_idx].clone();
            from_after.release(&demand);
            for (to_idx, to) in clusters.iter().enumerate() {
                if to_idx == *from_idx || !to.fits(&demand) {
                    continue;
                }
                let mut to_after = to.clone();
                if to_after.reserve(&demand).is_err() {
                    continue;
                }
                let objective =
                    Self::objective_with(clusters, *from_idx, &from_after, to_idx, &to_after);
                let incumbent = best.map(|(b, _, _)| b).unwrap_or(current);
                if objective + IMPROVEMENT_EPSILON < incumbent {
                    best = Some((objective, pos, to_idx));
                }
            }
        }
        best.map(|(objective, pos, to_idx)| (pos, to_idx, objective))
    }

    fn retry_unplaced(
        clusters: &mut [ClusterCapacity],
        placed: &mut Vec<(String, usize)>,
        unplaced: &mut Vec<UnplacedVm>,
        retried: &mut Vec<String>,
        vm_by_id: &HashMap<&str, &VmDemand>,
    ) -> BerthResult<()> {
        let mut still = Vec::new();
        for entry in unplaced.drain(..) {
            let Some(&vm) = vm_by_id.get(entry.vm_id.as_str()) else {
                still.push(entry);
                continue;
            };
            match PlacementEngine::balanced_choice(vm, clusters, None) {
                Some(idx) => {
                    clusters[idx].reserve(&vm.resources)?;
                    tracing::debug!(vm = %vm.id, cluster = %clusters[idx].id, "placed on retry");
                    placed.push((vm.id.clone(), idx));
                    retried.push(vm.id.clone());
                }
                None => still.push(entry),
            }
        }
        *unplaced = still;
        Ok(())
    }

    fn rebuild(
        original: PlacementResult,
        clusters: Vec<ClusterCapacity>,
        placed: &[(String, usize)],
        unplaced: &[UnplacedVm],
        retried: &[String],
        moved: &HashSet<String>,
        vm_by_id: &HashMap<&str, &VmDemand>,
    ) -> PlacementResult {
        let placement_of: HashMap<&str, usize> = placed
            .iter()
            .map(|(vm_id, idx)| (vm_id.as_str(), *idx))
            .collect();

        let mut assignments = Vec::with_capacity(placed.len());
        for assignment in &original.assignments {
            let Some(&idx) = placement_of.get(assignment.vm_id.as_str()) else {
                continue;
            };
            let cluster = &clusters[idx];
            let decided_by = if moved.contains(&assignment.vm_id) {
                "optimizer".to_string()
            } else {
                assignment.decided_by.clone()
            };
            assignments.push(PlacementAssignment {
                vm_id: assignment.vm_id.clone(),
                vm_name: assignment.vm_name.clone(),
                cluster_id: cluster.id.clone(),
                cluster_name: cluster.name.clone(),
                decided_by,
                residual: cluster.available,
            });
        }
        for vm_id in retried {
            let Some(&idx) = placement_of.get(vm_id.as_str()) else {
                continue;
            };
            let Some(vm) = vm_by_id.get(vm_id.as_str()) else {
                continue;
            };
            let cluster = &clusters[idx];
            assignments.push(PlacementAssignment {
                vm_id: vm.id.clone(),
                vm_name: vm.name.clone(),
                cluster_id: cluster.id.clone(),
                cluster_name: cluster.name.clone(),
                decided_by: "optimizer-retry".to_string(),
                residual: cluster.available,
            });
        }

        let warnings = unplaced
            .iter()
            .map(|entry| match vm_by_id.get(entry.vm_id.as_str()) {
                Some(vm) => format!(
                    "Unable to place VM '{}' ({}): insufficient cluster capacity",
                    vm.name, vm.resources
                ),
                None => format!(
                    "Unable to place VM '{}': insufficient cluster capacity",
                    entry.vm_name
                ),
            })
            .collect();

        PlacementEngine::assemble(
            assignments,
            unplaced.to_vec(),
            clusters,
            warnings,
            original.summary.total_vms,
            original.summary.strategy,
        )
    }
}
