//! Integration tests for the placement optimizer.

mod common;

use berth_core::scheduler::{
    Optimizer, PlacementEngine, PlacementResult, PlacementSummary, UnplacedReason, UnplacedVm,
};
use berth_core::types::PlacementStrategy;
use common::{assert_capacity_invariant, cluster, vm};
use pretty_assertions::assert_eq;

#[test]
fn rebalances_a_packed_placement() {
    let engine = PlacementEngine::new();
    let vms = vec![
        vm("vm-1", 2, 8, 50),
        vm("vm-2", 2, 8, 50),
        vm("vm-3", 2, 8, 50),
        vm("vm-4", 2, 8, 50),
    ];
    let clusters = vec![cluster("c1", 16, 64, 500), cluster("c2", 16, 64, 500)];

    // PackFirst piles everything onto c1, leaving c2 idle.
    let packed = engine
        .calculate(&vms, &clusters, PlacementStrategy::PackFirst, None)
        .unwrap();
    assert_eq!(packed.summary.clusters_used, 1);

    let outcome = Optimizer::new(None).optimize(packed, &vms).unwrap();

    assert!(!outcome.report.moves.is_empty());
    assert!(outcome.report.objective_after < outcome.report.objective_before);
    assert!(!outcome.report.ceiling_hit);
    assert_eq!(outcome.result.summary.placed_vms, 4);
    assert_eq!(outcome.result.summary.clusters_used, 2);
    assert_capacity_invariant(&outcome.result, &vms, &clusters);
}

#[test]
fn move_ceiling_bounds_the_search() {
    let engine = PlacementEngine::new();
    let vms = vec![
        vm("vm-1", 2, 8, 50),
        vm("vm-2", 2, 8, 50),
        vm("vm-3", 2, 8, 50),
        vm("vm-4", 2, 8, 50),
    ];
    let clusters = vec![cluster("c1", 16, 64, 500), cluster("c2", 16, 64, 500)];

    let packed = engine
        .calculate(&vms, &clusters, PlacementStrategy::PackFirst, None)
        .unwrap();
    let outcome = Optimizer::new(Some(1)).optimize(packed, &vms).unwrap();

    assert_eq!(outcome.report.moves.len(), 1);
    assert!(outcome.report.ceiling_hit);
}

#[test]
fn a_balanced_placement_is_a_fixed_point() {
    let engine = PlacementEngine::new();
    let vms = vec![vm("vm-1", 4, 16, 100), vm("vm-2", 4, 16, 100)];
    let clusters = vec![cluster("c1", 16, 64, 500), cluster("c2", 16, 64, 500)];

    let balanced = engine
        .calculate(&vms, &clusters, PlacementStrategy::Balanced, None)
        .unwrap();
    let outcome = Optimizer::new(None).optimize(balanced.clone(), &vms).unwrap();

    assert!(outcome.report.moves.is_empty());
    assert_eq!(outcome.report.objective_before, outcome.report.objective_after);
    assert_eq!(outcome.result.assignments.len(), balanced.assignments.len());
}

#[test]
fn unplaced_vm_is_retried_against_the_supplied_snapshot() {
    // A placement computed against an older, fuller snapshot: vm-2 was
    // reported unplaceable, but the clusters handed to the optimizer now
    // have room for it.
    let vms = vec![vm("vm-1", 4, 16, 100), vm("vm-2", 4, 16, 100)];
    let clusters = vec![cluster("c1", 16, 64, 500)];
    let stale = PlacementResult {
        assignments: Vec::new(),
        unplaced: vec![
            UnplacedVm {
                vm_id: "vm-2".to_string(),
                vm_name: "vm-2".to_string(),
                reason: UnplacedReason::InsufficientCapacity,
            },
        ],
        clusters: clusters.clone(),
        warnings: vec!["Unable to place VM 'vm-2'".to_string()],
        summary: PlacementSummary {
            total_vms: 2,
            placed_vms: 0,
            unplaced_vms: 1,
            clusters_used: 0,
            average_peak_utilization: 0.0,
            strategy: PlacementStrategy::Balanced,
        },
    };

    let outcome = Optimizer::new(None).optimize(stale, &vms).unwrap();

    assert!(outcome.result.unplaced.is_empty());
    let retried = &outcome.result.assignments[0];
    assert_eq!(retried.vm_id, "vm-2");
    assert_eq!(retried.decided_by, "optimizer-retry");
}

#[test]
fn truly_unplaceable_vms_stay_reported() {
    let engine = PlacementEngine::new();
    let vms = vec![vm("vm-1", 8, 16, 100), vm("vm-huge", 64, 512, 5000)];
    let clusters = vec![cluster("c1", 16, 64, 500), cluster("c2", 16, 64, 500)];

    let result = engine
        .calculate(&vms, &clusters, PlacementStrategy::Balanced, None)
        .unwrap();
    let outcome = Optimizer::new(None).optimize(result, &vms).unwrap();

    assert_eq!(outcome.result.unplaced.len(), 1);
    assert_eq!(outcome.result.unplaced[0].vm_id, "vm-huge");
    assert_eq!(outcome.result.warnings.len(), 1);
}
