//! Payment storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, payment_status_from_str, OptionalExt};
use crate::error::Result;
use crate::models::{Payment, PaymentStatus};

pub struct PaymentStore<'a> {
    conn: &'a Connection,
}

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        user_id: parse_uuid(&row.get::<_, String>(1)?)?,
        event_id: parse_uuid(&row.get::<_, String>(2)?)?,
        amount_cents: row.get(3)?,
        status: payment_status_from_str(&row.get::<_, String>(4)?)?,
        checkout_session_id: row.get(5)?,
        payment_ref_id: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?)?,
    })
}

const PAYMENT_COLUMNS: &str =
    "id, user_id, event_id, amount_cents, status, checkout_session_id, payment_ref_id, created_at";

impl<'a> PaymentStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new payment record
    #[instrument(skip(self, payment), fields(user_id = %payment.user_id, event_id = %payment.event_id))]
    pub fn create(&self, payment: &Payment) -> Result<()> {
        self.conn.execute(
            "INSERT INTO payments (id, user_id, event_id, amount_cents, status,
                                   checkout_session_id, payment_ref_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                payment.id.to_string(),
                payment.user_id.to_string(),
                payment.event_id.to_string(),
                payment.amount_cents,
                payment.status.as_str(),
                payment.checkout_session_id,
                payment.payment_ref_id,
                payment.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find payment by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"))?;

        let payment = stmt
            .query_row(params![id.to_string()], payment_from_row)
            .optional()?;

        Ok(payment)
    }

    /// Find the payment with the given status for a (user, event) pair
    #[instrument(skip(self))]
    pub fn find_for_user_event(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<Payment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE user_id = ?1 AND event_id = ?2 AND status = ?3"
        ))?;

        let payment = stmt
            .query_row(
                params![user_id.to_string(), event_id.to_string(), status.as_str()],
                payment_from_row,
            )
            .optional()?;

        Ok(payment)
    }

    /// Find the non-refunded payment for a (user, event) pair, if any.
    ///
    /// At most one exists at a time; pending checkouts are superseded in
    /// place rather than duplicated.
    pub fn find_open_for_user_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<Payment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE user_id = ?1 AND event_id = ?2 AND status != 'refunded'"
        ))?;

        let payment = stmt
            .query_row(
                params![user_id.to_string(), event_id.to_string()],
                payment_from_row,
            )
            .optional()?;

        Ok(payment)
    }

    /// All completed payments for an event (refund pass on event deletion)
    pub fn list_completed_for_event(&self, event_id: Uuid) -> Result<Vec<Payment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE event_id = ?1 AND status = 'completed'"
        ))?;

        let payments = stmt
            .query_map(params![event_id.to_string()], payment_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(payments)
    }

    /// Does the user hold a completed payment on any paid event?
    ///
    /// Guards user deletion: such users must be refunded or unregistered
    /// first.
    pub fn any_completed_paid_for_user(&self, user_id: Uuid) -> Result<bool> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM payments p
                 INNER JOIN events e ON e.id = p.event_id
                 WHERE p.user_id = ?1 AND p.status = 'completed' AND e.price_cents > 0
                 LIMIT 1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    /// Replace a pending payment's checkout session (repeat checkout)
    pub fn update_checkout(&self, payment_id: Uuid, session_id: &str, amount_cents: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE payments SET checkout_session_id = ?1, amount_cents = ?2
             WHERE id = ?3 AND status = 'pending'",
            params![session_id, amount_cents, payment_id.to_string()],
        )?;
        Ok(())
    }

    /// Mark a pending payment completed, recording the processor reference
    #[instrument(skip(self))]
    pub fn mark_completed(&self, payment_id: Uuid, payment_ref_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE payments SET status = 'completed', payment_ref_id = ?1
             WHERE id = ?2 AND status = 'pending'",
            params![payment_ref_id, payment_id.to_string()],
        )?;
        Ok(())
    }

    /// Mark a completed payment refunded
    #[instrument(skip(self))]
    pub fn mark_refunded(&self, payment_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE payments SET status = 'refunded' WHERE id = ?1",
            params![payment_id.to_string()],
        )?;
        Ok(())
    }
}
