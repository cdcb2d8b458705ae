//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                role INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Halls table
            -- status is a derived occupancy flag; the reservation table
            -- below is the authoritative record
            CREATE TABLE IF NOT EXISTS halls (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                location TEXT NOT NULL,
                capacity INTEGER NOT NULL CHECK (capacity > 0),
                status TEXT NOT NULL DEFAULT 'available',
                created_at TEXT NOT NULL
            );

            -- Events table
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                capacity INTEGER NOT NULL CHECK (capacity > 0),
                price_cents INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                start_date TEXT,
                end_date TEXT,
                hall_id TEXT,
                host_id TEXT NOT NULL,
                image_path TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (hall_id) REFERENCES halls(id),
                FOREIGN KEY (host_id) REFERENCES users(id)
            );

            -- Hall reservations: one event holds at most one reservation
            CREATE TABLE IF NOT EXISTS hall_reservations (
                id TEXT PRIMARY KEY,
                hall_id TEXT NOT NULL,
                event_id TEXT NOT NULL UNIQUE,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'reserved',
                created_at TEXT NOT NULL,
                FOREIGN KEY (hall_id) REFERENCES halls(id),
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE
            );

            -- Event registrations (attendee roster)
            CREATE TABLE IF NOT EXISTS event_registrations (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                registered_at TEXT NOT NULL,
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE(event_id, user_id)
            );

            -- Payments. Financial history: rows outlive the event and user
            -- they were made for, so no foreign keys here.
            CREATE TABLE IF NOT EXISTS payments (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                event_id TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                checkout_session_id TEXT,
                payment_ref_id TEXT,
                created_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for query performance",
        sql: r#"
            -- Reservation indexes: conflict checks and the expiry sweep
            CREATE INDEX IF NOT EXISTS idx_reservations_hall ON hall_reservations(hall_id);
            CREATE INDEX IF NOT EXISTS idx_reservations_hall_status
                ON hall_reservations(hall_id, status);
            CREATE INDEX IF NOT EXISTS idx_reservations_end ON hall_reservations(end_date);

            -- Event indexes
            CREATE INDEX IF NOT EXISTS idx_events_host ON events(host_id);
            CREATE INDEX IF NOT EXISTS idx_events_hall_status ON events(hall_id, status);

            -- Registration indexes
            CREATE INDEX IF NOT EXISTS idx_registrations_event ON event_registrations(event_id);
            CREATE INDEX IF NOT EXISTS idx_registrations_user ON event_registrations(user_id);

            -- Payment indexes
            CREATE INDEX IF NOT EXISTS idx_payments_user_event ON payments(user_id, event_id);
            CREATE INDEX IF NOT EXISTS idx_payments_event_status ON payments(event_id, status);
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}
