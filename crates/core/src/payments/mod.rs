//! Payment processor interface and refund rules
//!
//! The processor itself is an external collaborator; the core only sees
//! the [`PaymentGateway`] trait. Refunds are checked locally before the
//! processor is ever called, so a double refund never reaches the wire.

mod gateway;

pub use gateway::{CheckoutSession, InMemoryGateway, PaymentGateway};

use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::models::{Payment, PaymentStatus};
use crate::storage::PaymentStore;

/// Refund a completed payment through the processor and record the result.
///
/// Preconditions are checked before the external call: the payment must be
/// completed and carry a processor reference. On processor failure the
/// payment row is left untouched so the refund can be retried.
#[instrument(skip(payments, gateway, payment), fields(payment_id = %payment.id))]
pub fn refund_payment(
    payments: &PaymentStore<'_>,
    gateway: &dyn PaymentGateway,
    payment: &Payment,
) -> Result<()> {
    match payment.status {
        PaymentStatus::Refunded => {
            return Err(Error::Conflict("payment has already been refunded".into()));
        }
        PaymentStatus::Pending => {
            return Err(Error::PaymentRequired(
                "payment was never completed; nothing to refund".into(),
            ));
        }
        PaymentStatus::Completed => {}
    }

    let ref_id = payment.payment_ref_id.as_deref().ok_or_else(|| {
        Error::PaymentRequired("payment has no processor reference to refund against".into())
    })?;

    gateway.refund(ref_id, payment.amount_cents)?;
    payments.mark_refunded(payment.id)?;

    info!(amount_cents = payment.amount_cents, "Payment refunded");
    Ok(())
}
