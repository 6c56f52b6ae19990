use serde::{Deserialize, Serialize};

/// Resource quantities along the three placement dimensions. Used for both
/// demand (what a VM needs) and capacity (what a cluster offers).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceVector {
    pub cpu_cores: u32,
    pub memory_gb: u64,
    pub storage_gb: u64,
}

impl ResourceVector {
    pub const ZERO: ResourceVector = ResourceVector {
        cpu_cores: 0,
        memory_gb: 0,
        storage_gb: 0,
    };

    pub fn new(cpu_cores: u32, memory_gb: u64, storage_gb: u64) -> Self {
        Self {
            cpu_cores,
            memory_gb,
            storage_gb,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl std::fmt::Display for ResourceVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} cores/{} GB memory/{} GB storage",
            self.cpu_cores, self.memory_gb, self.storage_gb
        )
    }
}

/// One unit of workload to place. Immutable for the duration of a placement
/// computation; the engine never persists these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmDemand {
    pub id: String,
    pub name: String,
    pub resources: ResourceVector,
    /// Criticality flag consumed by the `SpreadCritical` strategy.
    #[serde(default)]
    pub critical: bool,
}

impl VmDemand {
    /// Priority weight used for largest-first ordering. The memory and
    /// storage divisors put the three dimensions on a comparable scale.
    pub fn footprint(&self) -> f64 {
        self.resources.cpu_cores as f64
            + self.resources.memory_gb as f64 / 8.0
            + self.resources.storage_gb as f64 / 100.0
    }
}

/// A placement target: fixed total capacity plus the remaining available
/// capacity. Snapshots are supplied by the caller per request; the engine
/// mutates only its own clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCapacity {
    pub id: String,
    pub name: String,
    pub total: ResourceVector,
    pub available: ResourceVector,
}

impl ClusterCapacity {
    /// Creates an empty cluster with its full capacity available.
    pub fn new(id: impl Into<String>, name: impl Into<String>, total: ResourceVector) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total,
            available: total,
        }
    }
}

/// Tie-break policy for the placement engine. Closed set, dispatched via
/// pattern match; adding a behavior means adding a variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementStrategy {
    /// Choose the cluster with the lowest peak per-dimension utilization
    /// after the assignment.
    #[default]
    Balanced,
    /// Fill clusters in the order given, minimizing the number used.
    PackFirst,
    /// Keep critical VMs on distinct clusters when possible, falling back
    /// to the balanced rule when not.
    SpreadCritical,
}
