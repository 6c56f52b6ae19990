//! Time-bounded reservations of physical hosts.
//!
//! Bookings are half-open intervals `[start, end)`; two bookings on the
//! same host must never overlap. The ledger serializes check-then-insert
//! per host: the sharded map's entry guard is held for the duration of the
//! overlap scan and the insert, so two writers racing on the same host
//! cannot both observe "no conflict". Writers on disjoint hosts proceed in
//! parallel.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BerthError, BerthResult};

/// A reservation of one host for one activity over a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub host_id: String,
    pub activity_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Booking {
    /// Half-open interval overlap: `[s1,e1)` and `[s2,e2)` overlap iff
    /// `s1 < e2 && s2 < e1`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

/// Per-host outcome of a bulk allocation request. Every requested host
/// gets exactly one entry; conflicts never abort the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAllocationOutcome {
    pub host_id: String,
    pub success: bool,
    pub booking_id: Option<Uuid>,
    pub conflicting_booking_id: Option<Uuid>,
}

/// A host's reservation timeline around a reference instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTimeline {
    pub host_id: String,
    /// All bookings for the host, sorted by start.
    pub bookings: Vec<Booking>,
    /// End of the most recent booking ending at or before `as_of`, when the
    /// host is currently unbooked. None while a booking covers `as_of` or
    /// when the host has no earlier booking.
    pub free_since: Option<DateTime<Utc>>,
    /// Earliest booking starting at or after `as_of`.
    pub next_reservation: Option<Booking>,
}

/// In-memory booking store. Durable persistence belongs to an external
/// inventory service; this ledger owns only the live conflict state.
#[derive(Debug, Default)]
pub struct BookingLedger {
    bookings: DashMap<String, Vec<Booking>>,
    host_by_booking: DashMap<Uuid, String>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Books every requested host for the window, independently per host.
    /// A host with a conflicting booking reports failure (carrying the
    /// conflicting booking id) without affecting the other hosts.
    pub fn bulk_allocate(
        &self,
        host_ids: &[String],
        activity_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BerthResult<Vec<HostAllocationOutcome>> {
        if end <= start {
            return Err(BerthError::InvalidInterval { start, end });
        }

        let mut outcomes = Vec::with_capacity(host_ids.len());
        for host_id in host_ids {
            // The entry guard keeps the overlap scan and the insert atomic
            // with respect to other writers of this host.
            let mut entry = self.bookings.entry(host_id.clone()).or_default();
            match entry.iter().find(|b| b.overlaps(start, end)) {
                Some(conflict) => {
                    tracing::debug!(
                        host = %host_id,
                        conflict = %conflict.id,
                        "allocation rejected, window overlaps existing booking"
                    );
                    outcomes.push(HostAllocationOutcome {
                        host_id: host_id.clone(),
                        success: false,
                        booking_id: None,
                        conflicting_booking_id: Some(conflict.id),
                    });
                }
                None => {
                    let booking = Booking {
                        id: Uuid::new_v4(),
                        host_id: host_id.clone(),
                        activity_id: activity_id.to_string(),
                        start,
                        end,
                    };
                    let idx = entry.partition_point(|b| b.start <= start);
                    self.host_by_booking.insert(booking.id, host_id.clone());
                    outcomes.push(HostAllocationOutcome {
                        host_id: host_id.clone(),
                        success: true,
                        booking_id: Some(booking.id),
                        conflicting_booking_id: None,
                    });
                    entry.insert(idx, booking);
                }
            }
        }

        let booked = outcomes.iter().filter(|o| o.success).count();
        tracing::info!(
            requested = host_ids.len(),
            booked,
            conflicted = host_ids.len() - booked,
            activity = %activity_id,
            "bulk allocation processed"
        );
        Ok(outcomes)
    }

    /// Deletes one booking. A second delete of the same id reports
    /// `NotFound`, as does any unknown id.
    pub fn remove_allocation(&self, booking_id: Uuid) -> BerthResult<()> {
        let host_id = self
            .host_by_booking
            .get(&booking_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BerthError::NotFound {
                resource: format!("booking {booking_id}"),
            })?;

        let Some(mut entry) = self.bookings.get_mut(&host_id) else {
            return Err(BerthError::NotFound {
                resource: format!("booking {booking_id}"),
            });
        };
        let Some(idx) = entry.iter().position(|b| b.id == booking_id) else {
            // A concurrent delete won the race.
            return Err(BerthError::NotFound {
                resource: format!("booking {booking_id}"),
            });
        };
        entry.remove(idx);
        self.host_by_booking.remove(&booking_id);
        tracing::debug!(host = %host_id, booking = %booking_id, "booking removed");
        Ok(())
    }

    /// Sorted bookings for a host plus the derived free-since / next
    /// reservation view around `as_of`. Hosts come into existence lazily on
    /// first booking, so an unknown host yields an empty timeline.
    pub fn host_timeline(&self, host_id: &str, as_of: DateTime<Utc>) -> HostTimeline {
        let bookings: Vec<Booking> = self
            .bookings
            .get(host_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let covered = bookings.iter().any(|b| b.start <= as_of && as_of < b.end);
        let free_since = if covered {
            None
        } else {
            bookings
                .iter()
                .filter(|b| b.end <= as_of)
                .map(|b| b.end)
                .max()
        };
        let next_reservation = bookings
            .iter()
            .filter(|b| b.start >= as_of)
            .min_by_key(|b| (b.start, b.id))
            .cloned();

        HostTimeline {
            host_id: host_id.to_string(),
            bookings,
            free_since,
            next_reservation,
        }
    }

    /// Number of live bookings across all hosts.
    pub fn len(&self) -> usize {
        self.host_by_booking.len()
    }

    pub fn is_empty(&self) -> bool {
        self.host_by_booking.is_empty()
    }
}
