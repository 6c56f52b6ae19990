#![allow(dead_code)]

use std::collections::HashMap;

use berth_core::scheduler::PlacementResult;
use berth_core::types::{ClusterCapacity, ResourceVector, VmDemand};

pub fn vm(id: &str, cpu: u32, memory: u64, storage: u64) -> VmDemand {
    VmDemand {
        id: id.to_string(),
        name: id.to_string(),
        resources: ResourceVector::new(cpu, memory, storage),
        critical: false,
    }
}

pub fn critical_vm(id: &str, cpu: u32, memory: u64, storage: u64) -> VmDemand {
    VmDemand {
        critical: true,
        ..vm(id, cpu, memory, storage)
    }
}

pub fn cluster(id: &str, cpu: u32, memory: u64, storage: u64) -> ClusterCapacity {
    ClusterCapacity::new(
        id,
        format!("Cluster {id}"),
        ResourceVector::new(cpu, memory, storage),
    )
}

/// For every cluster, the sum of assigned VM demands must stay within the
/// cluster's total capacity in every dimension.
pub fn assert_capacity_invariant(
    result: &PlacementResult,
    vms: &[VmDemand],
    clusters: &[ClusterCapacity],
) {
    let demand_of: HashMap<&str, ResourceVector> =
        vms.iter().map(|v| (v.id.as_str(), v.resources)).collect();
    for cluster in clusters {
        let assigned: ResourceVector = result
            .assignments
            .iter()
            .filter(|a| a.cluster_id == cluster.id)
            .map(|a| demand_of[a.vm_id.as_str()])
            .sum();
        assert!(
            assigned.fits_within(&cluster.total),
            "cluster {} over capacity: assigned {} vs total {}",
            cluster.id,
            assigned,
            cluster.total
        );
    }
}

pub fn cluster_of<'a>(result: &'a PlacementResult, vm_id: &str) -> &'a str {
    result
        .assignments
        .iter()
        .find(|a| a.vm_id == vm_id)
        .unwrap_or_else(|| panic!("vm {vm_id} not placed"))
        .cluster_id
        .as_str()
}
