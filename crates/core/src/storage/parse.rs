//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, Utc};
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::models::{EventStatus, HallStatus, PaymentStatus, ReservationStatus, Role};

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(|e| {
        SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse an optional UUID from a database string column
pub fn parse_uuid_opt(s: Option<String>) -> Result<Option<Uuid>, SqlError> {
    s.map(|s| parse_uuid(&s)).transpose()
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(&s)).transpose()
}

fn bad_status(column: &str, value: &str) -> SqlError {
    SqlError::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("unknown {column} value: {value}").into(),
    )
}

/// Parse an event status column
pub fn event_status_from_str(s: &str) -> Result<EventStatus, SqlError> {
    match s {
        "pending" => Ok(EventStatus::Pending),
        "approved" => Ok(EventStatus::Approved),
        "rejected" => Ok(EventStatus::Rejected),
        other => Err(bad_status("event status", other)),
    }
}

/// Parse a hall status column
pub fn hall_status_from_str(s: &str) -> Result<HallStatus, SqlError> {
    match s {
        "available" => Ok(HallStatus::Available),
        "reserved" => Ok(HallStatus::Reserved),
        other => Err(bad_status("hall status", other)),
    }
}

/// Parse a reservation status column
pub fn reservation_status_from_str(s: &str) -> Result<ReservationStatus, SqlError> {
    match s {
        "reserved" => Ok(ReservationStatus::Reserved),
        "cancelled" => Ok(ReservationStatus::Cancelled),
        other => Err(bad_status("reservation status", other)),
    }
}

/// Parse a payment status column
pub fn payment_status_from_str(s: &str) -> Result<PaymentStatus, SqlError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "completed" => Ok(PaymentStatus::Completed),
        "refunded" => Ok(PaymentStatus::Refunded),
        other => Err(bad_status("payment status", other)),
    }
}

/// Convert a u8 to Role
pub fn role_from_u8(value: u8) -> Role {
    match value {
        3 => Role::Admin,
        2 => Role::Host,
        _ => Role::User,
    }
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips() {
        assert_eq!(
            event_status_from_str(EventStatus::Approved.as_str()).unwrap(),
            EventStatus::Approved
        );
        assert_eq!(
            hall_status_from_str(HallStatus::Reserved.as_str()).unwrap(),
            HallStatus::Reserved
        );
        assert_eq!(
            reservation_status_from_str(ReservationStatus::Cancelled.as_str()).unwrap(),
            ReservationStatus::Cancelled
        );
        assert_eq!(
            payment_status_from_str(PaymentStatus::Refunded.as_str()).unwrap(),
            PaymentStatus::Refunded
        );
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(event_status_from_str("archived").is_err());
        assert!(hall_status_from_str("busy").is_err());
    }
}
