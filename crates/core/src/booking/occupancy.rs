//! Derived hall occupancy
//!
//! A hall's `status` flag is a cache of one question: does any reserved
//! reservation still reference it? This module is the only writer of that
//! flag. It always re-derives from the reservation table, never patches
//! incrementally, so running it twice is harmless.

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::models::HallStatus;
use crate::storage::{HallStore, ReservationStore};

/// Recompute and persist a hall's occupancy flag from live reservations.
///
/// Returns the derived status.
#[instrument(skip(halls, reservations))]
pub fn recompute(
    halls: &HallStore<'_>,
    reservations: &ReservationStore<'_>,
    hall_id: Uuid,
) -> Result<HallStatus> {
    let status = if reservations.any_reserved_for_hall(hall_id, None)? {
        HallStatus::Reserved
    } else {
        HallStatus::Available
    };

    halls.set_status(hall_id, status)?;
    debug!(%hall_id, %status, "Hall occupancy recomputed");

    Ok(status)
}
