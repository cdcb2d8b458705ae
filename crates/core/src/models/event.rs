//! Event model and approval status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Approval state of an event.
///
/// Every event starts `Pending`. `Approved` and `Rejected` are both
/// reachable from each other again via updates and re-review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A hosted event, optionally bound to a hall for a time window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Maximum number of registered attendees
    pub capacity: u32,
    /// Ticket price in cents; 0 means a free event
    pub price_cents: i64,
    pub status: EventStatus,
    /// Reservation window; present iff a hall is requested
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub hall_id: Option<Uuid>,
    pub host_id: Uuid,
    /// Opaque reference into the media store
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn new(title: String, description: String, capacity: u32, host_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            capacity,
            price_cents: 0,
            status: EventStatus::Pending,
            start_date: None,
            end_date: None,
            hall_id: None,
            host_id,
            image_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_hall(mut self, hall_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.hall_id = Some(hall_id);
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_price_cents(mut self, price_cents: i64) -> Self {
        self.price_cents = price_cents;
        self
    }

    pub fn with_image(mut self, image_path: String) -> Self {
        self.image_path = Some(image_path);
        self
    }

    /// Free events skip the payment leg entirely
    pub fn is_free(&self) -> bool {
        self.price_cents <= 0
    }

    /// The reservation window, if both endpoints are set
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}
