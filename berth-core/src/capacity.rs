//! Capacity arithmetic for clusters and demands.
//!
//! All checks are per-dimension with AND semantics: a demand fits only if
//! every dimension fits on its own, never by substituting surplus in one
//! dimension for a shortfall in another.

use serde::{Deserialize, Serialize};

use crate::error::{BerthError, BerthResult};
use crate::types::{ClusterCapacity, ResourceVector};

impl ResourceVector {
    /// True iff every dimension of `self` is within `other`.
    pub fn fits_within(&self, other: &ResourceVector) -> bool {
        self.cpu_cores <= other.cpu_cores
            && self.memory_gb <= other.memory_gb
            && self.storage_gb <= other.storage_gb
    }

    pub fn saturating_sub(&self, other: &ResourceVector) -> ResourceVector {
        ResourceVector {
            cpu_cores: self.cpu_cores.saturating_sub(other.cpu_cores),
            memory_gb: self.memory_gb.saturating_sub(other.memory_gb),
            storage_gb: self.storage_gb.saturating_sub(other.storage_gb),
        }
    }
}

impl std::ops::Add for ResourceVector {
    type Output = ResourceVector;

    fn add(self, rhs: ResourceVector) -> ResourceVector {
        ResourceVector {
            cpu_cores: self.cpu_cores + rhs.cpu_cores,
            memory_gb: self.memory_gb + rhs.memory_gb,
            storage_gb: self.storage_gb + rhs.storage_gb,
        }
    }
}

impl std::iter::Sum for ResourceVector {
    fn sum<I: Iterator<Item = ResourceVector>>(iter: I) -> ResourceVector {
        iter.fold(ResourceVector::ZERO, |acc, v| acc + v)
    }
}

fn ratio(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64
    }
}

impl ClusterCapacity {
    /// Rejects snapshots where available exceeds total in any dimension.
    pub fn validate(&self) -> BerthResult<()> {
        if !self.available.fits_within(&self.total) {
            return Err(BerthError::InvalidInput {
                field: format!("clusters[{}]", self.id),
                message: format!(
                    "available capacity ({}) exceeds total ({})",
                    self.available, self.total
                ),
            });
        }
        Ok(())
    }

    pub fn used(&self) -> ResourceVector {
        self.total.saturating_sub(&self.available)
    }

    /// True iff the demand fits in every dimension of the remaining capacity.
    pub fn fits(&self, demand: &ResourceVector) -> bool {
        demand.fits_within(&self.available)
    }

    /// Decrements available capacity by `demand`. Leaves the cluster
    /// untouched when the demand does not fit.
    pub fn reserve(&mut self, demand: &ResourceVector) -> BerthResult<()> {
        if !self.fits(demand) {
            return Err(BerthError::InsufficientResources {
                requested: demand.to_string(),
                available: self.available.to_string(),
            });
        }
        self.available = self.available.saturating_sub(demand);
        Ok(())
    }

    /// Returns previously reserved capacity. Clamped so available never
    /// exceeds total; callers must only release what they reserved.
    pub fn release(&mut self, demand: &ResourceVector) {
        let restored = self.available + *demand;
        self.available = ResourceVector {
            cpu_cores: restored.cpu_cores.min(self.total.cpu_cores),
            memory_gb: restored.memory_gb.min(self.total.memory_gb),
            storage_gb: restored.storage_gb.min(self.total.storage_gb),
        };
    }

    pub fn cpu_utilization(&self) -> f64 {
        ratio(self.used().cpu_cores as u64, self.total.cpu_cores as u64)
    }

    pub fn memory_utilization(&self) -> f64 {
        ratio(self.used().memory_gb, self.total.memory_gb)
    }

    pub fn storage_utilization(&self) -> f64 {
        ratio(self.used().storage_gb, self.total.storage_gb)
    }

    /// Highest utilization ratio across the three dimensions.
    pub fn peak_utilization(&self) -> f64 {
        self.cpu_utilization()
            .max(self.memory_utilization())
            .max(self.storage_utilization())
    }

    /// Peak utilization the cluster would reach after reserving `demand`.
    /// Callers check `fits` first.
    pub fn peak_utilization_after(&self, demand: &ResourceVector) -> f64 {
        let used = self.used() + *demand;
        ratio(used.cpu_cores as u64, self.total.cpu_cores as u64)
            .max(ratio(used.memory_gb, self.total.memory_gb))
            .max(ratio(used.storage_gb, self.total.storage_gb))
    }
}

/// Per-dimension capacity scaling applied to a snapshot before placement.
/// Mirrors the oversubscription ratios carried on destination clusters:
/// a ratio of 2.0 lets the scheduler allocate twice the physical CPU.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OversubscriptionPolicy {
    pub cpu_ratio: f64,
    pub memory_ratio: f64,
    pub storage_ratio: f64,
}

impl Default for OversubscriptionPolicy {
    fn default() -> Self {
        Self::conservative()
    }
}

impl OversubscriptionPolicy {
    /// No oversubscription in any dimension.
    pub fn conservative() -> Self {
        Self {
            cpu_ratio: 1.0,
            memory_ratio: 1.0,
            storage_ratio: 1.0,
        }
    }

    /// CPU-heavy oversubscription common for general-purpose workloads.
    pub fn moderate() -> Self {
        Self {
            cpu_ratio: 2.0,
            memory_ratio: 1.25,
            storage_ratio: 1.0,
        }
    }

    /// Ratios below 1.0 would shrink totals underneath already-reserved
    /// capacity and are rejected as malformed input.
    pub fn validate(&self) -> BerthResult<()> {
        for (dimension, value) in [
            ("cpu_ratio", self.cpu_ratio),
            ("memory_ratio", self.memory_ratio),
            ("storage_ratio", self.storage_ratio),
        ] {
            if !value.is_finite() || value < 1.0 {
                return Err(BerthError::InvalidInput {
                    field: format!("oversubscription.{dimension}"),
                    message: format!("ratio must be a finite value >= 1.0, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Produces the effective snapshot: totals are scaled up and the extra
    /// headroom is added to available, so capacity already in use stays
    /// accounted for.
    pub fn apply(&self, cluster: &ClusterCapacity) -> ClusterCapacity {
        let scaled = ResourceVector {
            cpu_cores: (cluster.total.cpu_cores as f64 * self.cpu_ratio).floor() as u32,
            memory_gb: (cluster.total.memory_gb as f64 * self.memory_ratio).floor() as u64,
            storage_gb: (cluster.total.storage_gb as f64 * self.storage_ratio).floor() as u64,
        };
        let headroom = scaled.saturating_sub(&cluster.total);
        ClusterCapacity {
            id: cluster.id.clone(),
            name: cluster.name.clone(),
            total: scaled,
            available: cluster.available + headroom,
        }
    }
}
