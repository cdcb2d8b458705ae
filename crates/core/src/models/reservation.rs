//! Hall reservation model
//!
//! The authoritative record binding one event to one hall for a time
//! window. Created only as a side effect of event approval, never by
//! client input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Reserved,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "reserved",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

/// One event's claim on one hall for `[start_date, end_date)`.
///
/// For a given hall, no two `Reserved` rows may overlap in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallReservation {
    pub id: Uuid,
    pub hall_id: Uuid,
    pub event_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl HallReservation {
    pub fn new(
        hall_id: Uuid,
        event_id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hall_id,
            event_id,
            start_date,
            end_date,
            status: ReservationStatus::Reserved,
            created_at: Utc::now(),
        }
    }
}
