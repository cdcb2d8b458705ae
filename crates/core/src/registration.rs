//! Attendance and payment reconciliation
//!
//! Registering for a paid event is a two-step handshake with the
//! processor: checkout opens a pending payment, confirmation completes it
//! and puts the attendee on the roster. Unregistering reverses it in the
//! opposite order: the refund commits before the roster link is removed,
//! never after, so a crash in between leaves money returned rather than
//! money kept.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::invariants;
use crate::models::{Actor, Event, EventStatus, Payment, PaymentStatus};
use crate::payments::{refund_payment, CheckoutSession, PaymentGateway};
use crate::permissions::{Capability, CapabilityMatrix};
use crate::storage::{Database, EventStore, PaymentStore};

/// What a registration attempt produced
#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    /// Free event: the attendee is on the roster
    Registered,
    /// Paid event: complete the checkout, then confirm
    CheckoutStarted(CheckoutSession),
}

/// Handles register / confirm / unregister and their payment legs
pub struct RegistrationCoordinator<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    gateway: &'a dyn PaymentGateway,
}

impl<'a> RegistrationCoordinator<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock, gateway: &'a dyn PaymentGateway) -> Self {
        Self { db, clock, gateway }
    }

    fn load_open_event(&self, events: &EventStore<'_>, event_id: Uuid) -> Result<Event> {
        let event = events
            .find_by_id(event_id)?
            .ok_or_else(|| Error::NotFound(format!("event {event_id}")))?;

        if event.status != EventStatus::Approved {
            return Err(Error::Conflict("event is not approved".into()));
        }
        Ok(event)
    }

    fn require_before_start(&self, event: &Event) -> Result<()> {
        if let Some(start) = event.start_date {
            if self.clock.now() >= start {
                return Err(Error::Conflict(
                    "registration closed: event has already started".into(),
                ));
            }
        }
        Ok(())
    }

    fn require_capacity(&self, events: &EventStore<'_>, event: &Event) -> Result<u32> {
        let registered = events.count_registrations(event.id)?;
        if registered >= event.capacity {
            return Err(Error::CapacityExceeded("event is fully booked".into()));
        }
        Ok(registered)
    }

    /// Register the calling user for an approved event.
    ///
    /// Free events put the attendee straight on the roster. Paid events
    /// open a checkout session and record a pending payment; the roster is
    /// untouched until [`Self::confirm_registration`]. A still-pending
    /// checkout is superseded by a fresh session rather than duplicated.
    #[instrument(skip_all, fields(actor = %actor.user_id, event_id = %event_id))]
    pub fn register(&self, actor: &Actor, event_id: Uuid) -> Result<RegistrationOutcome> {
        CapabilityMatrix::require(actor, Capability::RegisterForEvent)?;

        let event = {
            let tx = self.db.transaction()?;
            let events = EventStore::new(&tx);
            let payments = PaymentStore::new(&tx);

            let event = self.load_open_event(&events, event_id)?;
            self.require_before_start(&event)?;

            if events.is_registered(event.id, actor.user_id)? {
                return Err(Error::Conflict(
                    "user is already registered for this event".into(),
                ));
            }
            let registered = self.require_capacity(&events, &event)?;

            if event.is_free() {
                events.add_registration(event.id, actor.user_id, self.clock.now())?;
                invariants::assert_capacity_respected(registered + 1, event.capacity);
                tx.commit()?;
                info!("Registered for free event");
                return Ok(RegistrationOutcome::Registered);
            }

            if let Some(payment) = payments.find_open_for_user_event(actor.user_id, event.id)? {
                if payment.status == PaymentStatus::Completed {
                    return Err(Error::Conflict(
                        "a completed payment already exists; confirm the registration instead"
                            .into(),
                    ));
                }
            }

            tx.commit()?;
            event
        };

        // The processor call happens outside any transaction
        let session = self.gateway.create_checkout(
            event.price_cents,
            &event.title,
            serde_json::json!({
                "event_id": event.id.to_string(),
                "user_id": actor.user_id.to_string(),
            }),
        )?;

        let tx = self.db.transaction()?;
        let payments = PaymentStore::new(&tx);
        match payments.find_open_for_user_event(actor.user_id, event.id)? {
            Some(p) if p.status == PaymentStatus::Pending => {
                payments.update_checkout(p.id, &session.session_id, event.price_cents)?;
            }
            Some(_) => {
                return Err(Error::Conflict(
                    "a completed payment appeared during checkout".into(),
                ));
            }
            None => {
                let payment = Payment::new(
                    actor.user_id,
                    event.id,
                    event.price_cents,
                    session.session_id.clone(),
                );
                payments.create(&payment)?;
            }
        }

        tx.commit()?;
        info!(session_id = %session.session_id, "Checkout started for paid event");
        Ok(RegistrationOutcome::CheckoutStarted(session))
    }

    /// Confirm a paid registration after checkout.
    ///
    /// Completes the pending payment with the processor reference and adds
    /// the attendee to the roster. Confirming an already-registered
    /// attendee is a no-op.
    #[instrument(skip_all, fields(actor = %actor.user_id, event_id = %event_id))]
    pub fn confirm_registration(
        &self,
        actor: &Actor,
        event_id: Uuid,
        payment_ref_id: &str,
    ) -> Result<()> {
        CapabilityMatrix::require(actor, Capability::ConfirmRegistration)?;

        let tx = self.db.transaction()?;
        let events = EventStore::new(&tx);
        let payments = PaymentStore::new(&tx);

        let event = self.load_open_event(&events, event_id)?;
        self.require_before_start(&event)?;

        if events.is_registered(event.id, actor.user_id)? {
            return Ok(());
        }
        let registered = self.require_capacity(&events, &event)?;

        let payment = payments
            .find_for_user_event(actor.user_id, event.id, PaymentStatus::Pending)?
            .ok_or_else(|| {
                Error::NotFound("no pending payment found for this user and event".into())
            })?;

        payments.mark_completed(payment.id, payment_ref_id)?;
        events.add_registration(event.id, actor.user_id, self.clock.now())?;
        invariants::assert_capacity_respected(registered + 1, event.capacity);

        tx.commit()?;
        info!("Registration confirmed");
        Ok(())
    }

    /// Unregister the calling user from an event before it ends.
    ///
    /// Paid attendance is refunded through the processor before the roster
    /// link goes away; a refund failure leaves both the payment and the
    /// registration in place for a retry. Retrying after a refund that did
    /// commit only removes the remaining link.
    #[instrument(skip_all, fields(actor = %actor.user_id, event_id = %event_id))]
    pub fn unregister(&self, actor: &Actor, event_id: Uuid) -> Result<()> {
        CapabilityMatrix::require(actor, Capability::UnregisterFromEvent)?;

        let events = self.db.events();
        let payments = self.db.payments();

        let event = self.load_open_event(&events, event_id)?;

        if let Some(end) = event.end_date {
            if self.clock.now() > end {
                return Err(Error::Conflict(
                    "cannot unregister: event has already ended".into(),
                ));
            }
        }

        if !events.is_registered(event.id, actor.user_id)? {
            return Err(Error::NotFound("user is not registered for this event".into()));
        }

        if event.is_free() {
            events.remove_registration(event.id, actor.user_id)?;
            info!("Unregistered from free event");
            return Ok(());
        }

        match payments.find_for_user_event(actor.user_id, event.id, PaymentStatus::Completed)? {
            Some(payment) => {
                // Refund commits before the link is removed
                refund_payment(&payments, self.gateway, &payment)?;
            }
            None => {
                // A refund that already committed leaves only the link to
                // clean up; anything else is a missing payment record
                let refunded =
                    payments.find_for_user_event(actor.user_id, event.id, PaymentStatus::Refunded)?;
                if refunded.is_none() {
                    return Err(Error::NotFound(
                        "payment record not found or payment incomplete".into(),
                    ));
                }
            }
        }

        events.remove_registration(event.id, actor.user_id)?;
        info!("Unregistered and refunded");
        Ok(())
    }
}
