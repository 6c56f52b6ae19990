use std::collections::HashSet;

use crate::types::{ClusterCapacity, PlacementStrategy, VmDemand};

use super::PlacementEngine;

impl PlacementEngine {
    /// Picks the destination cluster for one VM, returning its index in the
    /// working set and the label of the rule that decided it.
    pub(super) fn select_cluster(
        &self,
        strategy: PlacementStrategy,
        vm: &VmDemand,
        clusters: &[ClusterCapacity],
        critical_hosts: &HashSet<String>,
    ) -> Option<(usize, &'static str)> {
        match strategy {
            PlacementStrategy::PackFirst => clusters
                .iter()
                .position(|c| c.fits(&vm.resources))
                .map(|idx| (idx, "pack-first")),
            PlacementStrategy::Balanced => {
                Self::balanced_choice(vm, clusters, None).map(|idx| (idx, "balanced"))
            }
            PlacementStrategy::SpreadCritical => {
                if vm.critical {
                    if let Some(idx) = Self::balanced_choice(vm, clusters, Some(critical_hosts)) {
                        return Some((idx, "spread-critical"));
                    }
                    // Every critical-free cluster is full; colocate rather
                    // than fail the VM.
                    Self::balanced_choice(vm, clusters, None)
                        .map(|idx| (idx, "spread-critical-fallback"))
                } else {
                    Self::balanced_choice(vm, clusters, None).map(|idx| (idx, "balanced"))
                }
            }
        }
    }

    /// Balanced rule: the fitting cluster whose peak per-dimension
    /// utilization after the assignment is lowest, ties broken by ascending
    /// cluster id.
    pub(crate) fn balanced_choice(
        vm: &VmDemand,
        clusters: &[ClusterCapacity],
        excluded: Option<&HashSet<String>>,
    ) -> Option<usize> {
        let mut best: Option<(f64, &str, usize)> = None;
        for (idx, cluster) in clusters.iter().enumerate() {
            if excluded.is_some_and(|set| set.contains(&cluster.id)) {
                continue;
            }
            if !cluster.fits(&vm.resources) {
                continue;
            }
            let peak = cluster.peak_utilization_after(&vm.resources);
            let better = match best {
                None => true,
                Some((best_peak, best_id, _)) => {
                    peak < best_peak || (peak == best_peak && cluster.id.as_str() < best_id)
                }
            };
            if better {
                best = Some((peak, cluster.id.as_str(), idx));
            }
        }
        best.map(|(_, _, idx)| idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceVector;

    fn vm(id: &str, cpu: u32) -> VmDemand {
        VmDemand {
            id: id.to_string(),
            name: id.to_string(),
            resources: ResourceVector::new(cpu, 1, 1),
            critical: false,
        }
    }

    fn cluster(id: &str, cpu: u32) -> ClusterCapacity {
        ClusterCapacity::new(id, id, ResourceVector::new(cpu, 100, 100))
    }

    #[test]
    fn balanced_prefers_lower_peak_utilization() {
        let clusters = vec![cluster("a", 10), cluster("b", 100)];
        let idx = PlacementEngine::balanced_choice(&vm("v", 5), &clusters, None).unwrap();
        assert_eq!(clusters[idx].id, "b");
    }

    #[test]
    fn balanced_ties_break_by_ascending_id() {
        // Identical clusters listed out of id order
        let clusters = vec![cluster("b", 10), cluster("a", 10)];
        let idx = PlacementEngine::balanced_choice(&vm("v", 5), &clusters, None).unwrap();
        assert_eq!(clusters[idx].id, "a");
    }

    #[test]
    fn excluded_clusters_are_skipped() {
        let clusters = vec![cluster("a", 10), cluster("b", 10)];
        let excluded: HashSet<String> = ["a".to_string()].into_iter().collect();
        let idx = PlacementEngine::balanced_choice(&vm("v", 5), &clusters, Some(&excluded)).unwrap();
        assert_eq!(clusters[idx].id, "b");
    }
}
