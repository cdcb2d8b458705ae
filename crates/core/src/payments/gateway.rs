//! Payment gateway trait and in-memory implementation
//!
//! Mirrors the two processor calls the core depends on: opening a
//! checkout session and refunding a captured payment. Real deployments
//! plug a processor-backed implementation in at the application layer.

use std::sync::Mutex;

use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A checkout session opened with the processor
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub session_id: String,
    /// Where the attendee completes payment
    pub redirect_url: String,
}

/// External payment processor capability
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout session for the given amount
    fn create_checkout(
        &self,
        amount_cents: i64,
        description: &str,
        metadata: Value,
    ) -> Result<CheckoutSession>;

    /// Refund a captured payment by processor reference.
    ///
    /// Failure must leave no local state assumption; callers retry.
    fn refund(&self, payment_ref_id: &str, amount_cents: i64) -> Result<()>;
}

#[derive(Debug, Default)]
struct GatewayState {
    checkouts: Vec<(i64, String)>,
    refunds: Vec<(String, i64)>,
    fail_refunds: bool,
}

/// In-process gateway for tests and local development.
///
/// Records every call; refund failure is injectable.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<GatewayState>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent refund calls fail
    pub fn fail_refunds(&self, fail: bool) {
        self.state.lock().unwrap().fail_refunds = fail;
    }

    /// Number of checkout sessions opened
    pub fn checkout_calls(&self) -> usize {
        self.state.lock().unwrap().checkouts.len()
    }

    /// Number of refunds the processor accepted
    pub fn refund_calls(&self) -> usize {
        self.state.lock().unwrap().refunds.len()
    }

    /// Processor references refunded so far
    pub fn refunded_refs(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .refunds
            .iter()
            .map(|(r, _)| r.clone())
            .collect()
    }
}

impl PaymentGateway for InMemoryGateway {
    fn create_checkout(
        &self,
        amount_cents: i64,
        description: &str,
        _metadata: Value,
    ) -> Result<CheckoutSession> {
        let session_id = format!("sess_{}", Uuid::new_v4().simple());
        let mut state = self.state.lock().unwrap();
        state.checkouts.push((amount_cents, description.to_string()));
        Ok(CheckoutSession {
            redirect_url: format!("mem://checkout/{session_id}"),
            session_id,
        })
    }

    fn refund(&self, payment_ref_id: &str, amount_cents: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_refunds {
            return Err(Error::RefundFailed(format!(
                "processor rejected refund of {payment_ref_id}"
            )));
        }
        state.refunds.push((payment_ref_id.to_string(), amount_cents));
        Ok(())
    }
}
