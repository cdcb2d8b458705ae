//! Hall storage operations

use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{hall_status_from_str, parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{Hall, HallStatus};

pub struct HallStore<'a> {
    conn: &'a Connection,
}

impl<'a> HallStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new hall
    #[instrument(skip(self, hall), fields(hall_name = %hall.name))]
    pub fn create(&self, hall: &Hall) -> Result<()> {
        self.conn.execute(
            "INSERT INTO halls (id, name, location, capacity, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                hall.id.to_string(),
                hall.name,
                hall.location,
                hall.capacity,
                hall.status.as_str(),
                hall.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find hall by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Hall>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, location, capacity, status, created_at FROM halls WHERE id = ?1",
        )?;

        let hall = stmt
            .query_row(params![id.to_string()], |row| {
                Ok(Hall {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    name: row.get(1)?,
                    location: row.get(2)?,
                    capacity: row.get(3)?,
                    status: hall_status_from_str(&row.get::<_, String>(4)?)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?)?,
                })
            })
            .optional()?;

        Ok(hall)
    }

    /// Update hall fields (name, location, capacity)
    #[instrument(skip(self, hall), fields(hall_id = %hall.id))]
    pub fn update(&self, hall: &Hall) -> Result<()> {
        self.conn.execute(
            "UPDATE halls SET name = ?1, location = ?2, capacity = ?3 WHERE id = ?4",
            params![hall.name, hall.location, hall.capacity, hall.id.to_string()],
        )?;
        Ok(())
    }

    /// Set the derived occupancy flag.
    ///
    /// Only the occupancy recomputation writes this; see
    /// [`crate::booking::occupancy`].
    pub fn set_status(&self, hall_id: Uuid, status: HallStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE halls SET status = ?1 WHERE id = ?2",
            params![status.as_str(), hall_id.to_string()],
        )?;
        Ok(())
    }

    /// Delete a hall
    #[instrument(skip(self))]
    pub fn delete(&self, hall_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM halls WHERE id = ?1",
            params![hall_id.to_string()],
        )?;
        Ok(())
    }
}
