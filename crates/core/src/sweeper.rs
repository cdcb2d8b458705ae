//! Expiry sweep
//!
//! Retires reservations whose end time has passed and reclaims their
//! halls. Runs on a timer in the application layer, independent of
//! request traffic, and answers the "is this hall still held?" question
//! with the same query the lifecycle cascades use, so the two paths can
//! never disagree about when a hall is free.
//!
//! Event status is deliberately untouched: an event whose window lapsed
//! stays approved in history; only the hall resource is reclaimed.

use tracing::{error, info, instrument};

use crate::booking::occupancy;
use crate::clock::Clock;
use crate::error::Result;
use crate::storage::{Database, HallStore, ReservationStore};

/// What one sweep cycle accomplished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub reservations_removed: u64,
    pub halls_recomputed: usize,
    pub halls_failed: usize,
}

/// Run one sweep cycle.
///
/// Expired reservations are deleted in one transaction; each affected
/// hall's occupancy is then re-derived in its own transaction so one
/// hall's failure never aborts the rest of the cycle.
#[instrument(skip_all)]
pub fn sweep_expired_reservations(db: &Database, clock: &dyn Clock) -> Result<SweepSummary> {
    let now = clock.now();
    let mut summary = SweepSummary::default();

    let affected_halls = {
        let tx = db.transaction()?;
        let reservations = ReservationStore::new(&tx);

        let affected = reservations.halls_with_expired(now)?;
        summary.reservations_removed = reservations.delete_expired(now)?;
        tx.commit()?;
        affected
    };

    for hall_id in affected_halls {
        let result = db.transaction().and_then(|tx| {
            let halls = HallStore::new(&tx);
            let reservations = ReservationStore::new(&tx);
            occupancy::recompute(&halls, &reservations, hall_id)?;
            tx.commit()?;
            Ok(())
        });

        match result {
            Ok(()) => summary.halls_recomputed += 1,
            Err(e) => {
                // Isolate per-hall failures; the next cycle retries
                error!(%hall_id, error = %e, "Failed to reclaim hall");
                summary.halls_failed += 1;
            }
        }
    }

    if summary.reservations_removed > 0 {
        info!(
            removed = summary.reservations_removed,
            halls = summary.halls_recomputed,
            "Expired hall reservations cleaned up"
        );
    }

    Ok(summary)
}
