//! SQLite storage layer for Banquet
//!
//! Per-entity stores borrow the connection; multi-step lifecycle cascades
//! run inside a single transaction obtained from [`Database::transaction`]
//! so a conflict check and the reservation write it guards commit
//! atomically.

mod events;
mod halls;
mod migrations;
mod parse;
mod payments;
mod reservations;
mod users;

use rusqlite::{Connection, Transaction};
use std::path::Path;
use tracing::instrument;

use crate::error::Result;

pub use events::EventStore;
pub use halls::HallStore;
pub use payments::PaymentStore;
pub use reservations::ReservationStore;
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Begin a transaction spanning a read-check-write cascade.
    ///
    /// Stores constructed on the returned transaction (it derefs to
    /// [`Connection`]) see and produce uncommitted state; dropping the
    /// transaction without [`Transaction::commit`] rolls the cascade back.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Get user store
    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    /// Get hall store
    pub fn halls(&self) -> HallStore<'_> {
        HallStore::new(&self.conn)
    }

    /// Get event store
    pub fn events(&self) -> EventStore<'_> {
        EventStore::new(&self.conn)
    }

    /// Get reservation store
    pub fn reservations(&self) -> ReservationStore<'_> {
        ReservationStore::new(&self.conn)
    }

    /// Get payment store
    pub fn payments(&self) -> PaymentStore<'_> {
        PaymentStore::new(&self.conn)
    }
}
