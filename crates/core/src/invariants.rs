//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::booking::conflict::intervals_overlap;
use crate::models::{Event, EventStatus, HallReservation, HallStatus, ReservationStatus};

/// Validate that a reservation's window is well-formed
pub fn assert_reservation_window(reservation: &HallReservation) {
    debug_assert!(
        reservation.start_date < reservation.end_date,
        "Reservation {} has start {} not before end {}",
        reservation.id,
        reservation.start_date,
        reservation.end_date
    );
}

/// Validate that no two reserved reservations on a hall overlap
pub fn assert_reservations_disjoint(reservations: &[HallReservation]) {
    let reserved: Vec<_> = reservations
        .iter()
        .filter(|r| r.status == ReservationStatus::Reserved)
        .collect();

    for (i, a) in reserved.iter().enumerate() {
        for b in reserved.iter().skip(i + 1) {
            debug_assert!(
                !intervals_overlap(a.start_date, a.end_date, b.start_date, b.end_date),
                "Reservations {} and {} overlap on hall {}",
                a.id,
                b.id,
                a.hall_id
            );
        }
    }
}

/// Validate that an approved event and its reservation agree.
///
/// An approved event either requests no hall, or its reservation matches
/// its current hall and window exactly.
pub fn assert_event_matches_reservation(event: &Event, reservation: Option<&HallReservation>) {
    if event.status != EventStatus::Approved {
        return;
    }

    match (event.hall_id, reservation) {
        (None, _) => {}
        (Some(hall_id), Some(r)) => {
            debug_assert!(
                r.status == ReservationStatus::Reserved
                    && r.hall_id == hall_id
                    && Some(r.start_date) == event.start_date
                    && Some(r.end_date) == event.end_date,
                "Approved event {} diverges from its reservation {}",
                event.id,
                r.id
            );
        }
        (Some(hall_id), None) => {
            debug_assert!(
                false,
                "Approved event {} references hall {} but holds no reservation",
                event.id, hall_id
            );
        }
    }
}

/// Validate that a hall's derived flag matches the reservation table
pub fn assert_hall_status_derived(status: HallStatus, any_reserved: bool) {
    debug_assert!(
        (status == HallStatus::Reserved) == any_reserved,
        "Hall status {status} contradicts reservation table (any_reserved = {any_reserved})"
    );
}

/// Validate that a roster never exceeds the event capacity
pub fn assert_capacity_respected(registered: u32, capacity: u32) {
    debug_assert!(
        registered <= capacity,
        "Roster size {registered} exceeds capacity {capacity}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn reservation(start_h: u32, end_h: u32) -> HallReservation {
        HallReservation::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Utc.with_ymd_and_hms(2025, 3, 1, start_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, end_h, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_disjoint_reservations_pass() {
        let a = reservation(10, 11);
        let b = reservation(11, 12);
        assert_reservations_disjoint(&[a, b]);
    }

    #[test]
    #[should_panic(expected = "overlap")]
    fn test_overlapping_reservations_panic() {
        let a = reservation(10, 12);
        let b = reservation(11, 13);
        assert_reservations_disjoint(&[a, b]);
    }

    #[test]
    fn test_cancelled_reservations_ignored() {
        let a = reservation(10, 12);
        let mut b = reservation(11, 13);
        b.status = ReservationStatus::Cancelled;
        assert_reservations_disjoint(&[a, b]);
    }

    #[test]
    #[should_panic(expected = "holds no reservation")]
    fn test_approved_event_without_reservation_panics() {
        let mut event = Event::new("E".into(), "d".into(), 10, Uuid::new_v4());
        event.hall_id = Some(Uuid::new_v4());
        event.status = EventStatus::Approved;
        assert_event_matches_reservation(&event, None);
    }

    #[test]
    fn test_hall_status_derivation() {
        assert_hall_status_derived(HallStatus::Reserved, true);
        assert_hall_status_derived(HallStatus::Available, false);
    }
}
