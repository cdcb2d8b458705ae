//! Hall model - the bookable venue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse occupancy flag for a hall.
///
/// Derived from the reservation table, never authoritative on its own:
/// a hall is `Reserved` iff at least one reserved reservation references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HallStatus {
    Available,
    Reserved,
}

impl HallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HallStatus::Available => "available",
            HallStatus::Reserved => "reserved",
        }
    }
}

impl std::fmt::Display for HallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A physical venue that events reserve for a time window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hall {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub capacity: u32,
    /// Derived occupancy flag; see [`HallStatus`]
    pub status: HallStatus,
    pub created_at: DateTime<Utc>,
}

impl Hall {
    pub fn new(name: String, location: String, capacity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            location,
            capacity,
            status: HallStatus::Available,
            created_at: Utc::now(),
        }
    }
}
