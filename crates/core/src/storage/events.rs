//! Event storage operations
//!
//! Also owns the attendee roster (`event_registrations`), which the
//! original design embedded in the event record.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    event_status_from_str, parse_datetime, parse_datetime_opt, parse_uuid, parse_uuid_opt,
    OptionalExt,
};
use crate::error::Result;
use crate::models::Event;

pub struct EventStore<'a> {
    conn: &'a Connection,
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        title: row.get(1)?,
        description: row.get(2)?,
        capacity: row.get(3)?,
        price_cents: row.get(4)?,
        status: event_status_from_str(&row.get::<_, String>(5)?)?,
        start_date: parse_datetime_opt(row.get::<_, Option<String>>(6)?)?,
        end_date: parse_datetime_opt(row.get::<_, Option<String>>(7)?)?,
        hall_id: parse_uuid_opt(row.get::<_, Option<String>>(8)?)?,
        host_id: parse_uuid(&row.get::<_, String>(9)?)?,
        image_path: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(12)?)?,
    })
}

const EVENT_COLUMNS: &str = "id, title, description, capacity, price_cents, status, \
     start_date, end_date, hall_id, host_id, image_path, created_at, updated_at";

impl<'a> EventStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new event
    #[instrument(skip(self, event), fields(title = %event.title))]
    pub fn create(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, title, description, capacity, price_cents, status,
                                 start_date, end_date, hall_id, host_id, image_path,
                                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                event.id.to_string(),
                event.title,
                event.description,
                event.capacity,
                event.price_cents,
                event.status.as_str(),
                event.start_date.map(|d| d.to_rfc3339()),
                event.end_date.map(|d| d.to_rfc3339()),
                event.hall_id.map(|h| h.to_string()),
                event.host_id.to_string(),
                event.image_path,
                event.created_at.to_rfc3339(),
                event.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find event by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"))?;

        let event = stmt
            .query_row(params![id.to_string()], event_from_row)
            .optional()?;

        Ok(event)
    }

    /// Update all mutable event fields
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    pub fn update(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "UPDATE events SET title = ?1, description = ?2, capacity = ?3, price_cents = ?4,
                               status = ?5, start_date = ?6, end_date = ?7, hall_id = ?8,
                               image_path = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                event.title,
                event.description,
                event.capacity,
                event.price_cents,
                event.status.as_str(),
                event.start_date.map(|d| d.to_rfc3339()),
                event.end_date.map(|d| d.to_rfc3339()),
                event.hall_id.map(|h| h.to_string()),
                event.image_path,
                event.updated_at.to_rfc3339(),
                event.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Delete an event (registrations and its reservation cascade)
    #[instrument(skip(self))]
    pub fn delete(&self, event_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM events WHERE id = ?1",
            params![event_id.to_string()],
        )?;
        Ok(())
    }

    /// Count approved events created by a host
    pub fn count_approved_for_host(&self, host_id: Uuid) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM events WHERE host_id = ?1 AND status = 'approved'",
            params![host_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete every event created by a host (account removal cascade)
    pub fn delete_all_for_host(&self, host_id: Uuid) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM events WHERE host_id = ?1",
            params![host_id.to_string()],
        )?;
        Ok(count as u64)
    }

    /// Does any event still reference this hall?
    ///
    /// Guards hall deletion.
    pub fn any_referencing_hall(&self, hall_id: Uuid) -> Result<bool> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM events WHERE hall_id = ?1 LIMIT 1",
                params![hall_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    /// Does any approved event on this hall exceed the given capacity?
    ///
    /// Used by the hall capacity-reduction guard.
    pub fn any_approved_exceeding_capacity(&self, hall_id: Uuid, capacity: u32) -> Result<bool> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM events
                 WHERE hall_id = ?1 AND status = 'approved' AND capacity > ?2
                 LIMIT 1",
                params![hall_id.to_string(), capacity],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    // --- Attendee roster ---

    /// Register a user for an event
    #[instrument(skip(self))]
    pub fn add_registration(&self, event_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO event_registrations (id, event_id, user_id, registered_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                Uuid::new_v4().to_string(),
                event_id.to_string(),
                user_id.to_string(),
                at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Remove a user from an event's roster
    #[instrument(skip(self))]
    pub fn remove_registration(&self, event_id: Uuid, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM event_registrations WHERE event_id = ?1 AND user_id = ?2",
            params![event_id.to_string(), user_id.to_string()],
        )?;
        Ok(())
    }

    /// Remove a user from every roster (user deletion cascade)
    pub fn remove_all_registrations_for_user(&self, user_id: Uuid) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM event_registrations WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        Ok(count as u64)
    }

    /// Is the user on the event's roster?
    pub fn is_registered(&self, event_id: Uuid, user_id: Uuid) -> Result<bool> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM event_registrations WHERE event_id = ?1 AND user_id = ?2",
                params![event_id.to_string(), user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    /// Number of registered attendees
    pub fn count_registrations(&self, event_id: Uuid) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_registrations WHERE event_id = ?1",
            params![event_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
