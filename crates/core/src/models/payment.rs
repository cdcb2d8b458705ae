//! Payment model
//!
//! Records one attendee's checkout for one paid event. Payment rows are
//! financial history and outlive the event they were made for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Checkout session created, not yet captured by the processor
    Pending,
    /// Captured; a processor reference is recorded
    Completed,
    /// Returned to the attendee
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// A (user, event) checkout record.
///
/// At most one non-refunded payment exists per (user, event) pair at a
/// time; a repeat checkout supersedes the pending row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    /// Processor checkout session, set when the session is opened
    pub checkout_session_id: Option<String>,
    /// Processor capture reference, set at confirmation; required for refunds
    pub payment_ref_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(user_id: Uuid, event_id: Uuid, amount_cents: i64, session_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            amount_cents,
            status: PaymentStatus::Pending,
            checkout_session_id: Some(session_id),
            payment_ref_id: None,
            created_at: Utc::now(),
        }
    }
}
