//! Hall reservation storage operations
//!
//! This table is the authoritative booking record. Every overlap and
//! occupancy question the engine or the sweeper asks is answered here,
//! with one shared set of queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, reservation_status_from_str, OptionalExt};
use crate::error::Result;
use crate::models::HallReservation;

pub struct ReservationStore<'a> {
    conn: &'a Connection,
}

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<HallReservation> {
    Ok(HallReservation {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        hall_id: parse_uuid(&row.get::<_, String>(1)?)?,
        event_id: parse_uuid(&row.get::<_, String>(2)?)?,
        start_date: parse_datetime(&row.get::<_, String>(3)?)?,
        end_date: parse_datetime(&row.get::<_, String>(4)?)?,
        status: reservation_status_from_str(&row.get::<_, String>(5)?)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}

const RESERVATION_COLUMNS: &str =
    "id, hall_id, event_id, start_date, end_date, status, created_at";

impl<'a> ReservationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new reservation
    #[instrument(skip(self, reservation), fields(hall_id = %reservation.hall_id, event_id = %reservation.event_id))]
    pub fn create(&self, reservation: &HallReservation) -> Result<()> {
        self.conn.execute(
            "INSERT INTO hall_reservations (id, hall_id, event_id, start_date, end_date, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                reservation.id.to_string(),
                reservation.hall_id.to_string(),
                reservation.event_id.to_string(),
                reservation.start_date.to_rfc3339(),
                reservation.end_date.to_rfc3339(),
                reservation.status.as_str(),
                reservation.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find the reservation held by an event, if any
    #[instrument(skip(self))]
    pub fn find_by_event(&self, event_id: Uuid) -> Result<Option<HallReservation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM hall_reservations WHERE event_id = ?1"
        ))?;

        let reservation = stmt
            .query_row(params![event_id.to_string()], reservation_from_row)
            .optional()?;

        Ok(reservation)
    }

    /// Delete the reservation held by an event, returning it if one existed
    #[instrument(skip(self))]
    pub fn delete_by_event(&self, event_id: Uuid) -> Result<Option<HallReservation>> {
        let existing = self.find_by_event(event_id)?;
        if existing.is_some() {
            self.conn.execute(
                "DELETE FROM hall_reservations WHERE event_id = ?1",
                params![event_id.to_string()],
            )?;
        }
        Ok(existing)
    }

    /// Find a reserved reservation on the hall overlapping `[start, end)`.
    ///
    /// Half-open semantics: windows touching at a boundary do not overlap.
    /// `exclude_event` skips the reservation belonging to the event under
    /// modification so an event never conflicts with itself.
    #[instrument(skip(self))]
    pub fn find_overlapping(
        &self,
        hall_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_event: Option<Uuid>,
    ) -> Result<Option<HallReservation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM hall_reservations
             WHERE hall_id = ?1 AND status = 'reserved'
               AND start_date < ?2 AND end_date > ?3
               AND (?4 IS NULL OR event_id != ?4)
             LIMIT 1"
        ))?;

        let reservation = stmt
            .query_row(
                params![
                    hall_id.to_string(),
                    end.to_rfc3339(),
                    start.to_rfc3339(),
                    exclude_event.map(|e| e.to_string()),
                ],
                reservation_from_row,
            )
            .optional()?;

        Ok(reservation)
    }

    /// Does any reserved reservation still reference this hall?
    ///
    /// The single occupancy question shared by the lifecycle cascades and
    /// the expiry sweep, always answered live against the table.
    pub fn any_reserved_for_hall(&self, hall_id: Uuid, exclude_event: Option<Uuid>) -> Result<bool> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM hall_reservations
                 WHERE hall_id = ?1 AND status = 'reserved'
                   AND (?2 IS NULL OR event_id != ?2)
                 LIMIT 1",
                params![hall_id.to_string(), exclude_event.map(|e| e.to_string())],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    /// List all reservations on a hall (diagnostics and invariant checks)
    pub fn list_for_hall(&self, hall_id: Uuid) -> Result<Vec<HallReservation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM hall_reservations
             WHERE hall_id = ?1 ORDER BY start_date"
        ))?;

        let reservations = stmt
            .query_map(params![hall_id.to_string()], reservation_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(reservations)
    }

    /// Distinct halls referenced by reservations that ended before `now`
    pub fn halls_with_expired(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT hall_id FROM hall_reservations WHERE end_date < ?1",
        )?;

        let halls = stmt
            .query_map(params![now.to_rfc3339()], |row| {
                parse_uuid(&row.get::<_, String>(0)?)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(halls)
    }

    /// Delete every reservation that ended before `now`, returning the count
    pub fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM hall_reservations WHERE end_date < ?1",
            params![now.to_rfc3339()],
        )?;
        Ok(count as u64)
    }
}
