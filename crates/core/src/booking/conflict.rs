//! Interval conflict detection
//!
//! One overlap rule for the whole system: request-driven approvals, slot
//! updates, and the expiry sweep all answer "is this hall taken?" through
//! this module.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::ReservationStore;

/// Half-open interval overlap: `[s1, e1)` and `[s2, e2)` overlap iff
/// `s1 < e2 && s2 < e1`.
///
/// Back-to-back windows that touch at a boundary do not conflict.
pub fn intervals_overlap(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// Is any reserved reservation on the hall overlapping `[start, end)`?
///
/// `exclude_event` skips the reservation of the event being modified so a
/// re-approval never conflicts with itself. Pure read; no side effects.
pub fn has_conflict(
    reservations: &ReservationStore<'_>,
    hall_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_event: Option<Uuid>,
) -> Result<bool> {
    let overlapping = reservations.find_overlapping(hall_id, start, end, exclude_event)?;
    Ok(overlapping.is_some())
}
