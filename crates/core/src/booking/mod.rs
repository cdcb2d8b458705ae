//! Event lifecycle engine
//!
//! The single mutator of events, reservations, and hall occupancy.
//! Every transition runs its full cascade (capability check, conflict
//! check, reservation mutation, occupancy recompute, event persist)
//! inside one storage transaction, so callers observe it all-or-nothing
//! and no concurrent approval can slip between the check and the write.
//!
//! Freeing a hall is always keyed off the cancelled reservation's hall,
//! not the event's hall field; the two can diverge mid-cascade.

pub mod conflict;
pub mod occupancy;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::invariants;
use crate::media::MediaStore;
use crate::models::{Actor, Event, EventStatus, Hall, HallReservation, Role};
use crate::payments::{refund_payment, PaymentGateway};
use crate::permissions::{Capability, CapabilityMatrix};
use crate::storage::{Database, EventStore, HallStore, PaymentStore, ReservationStore, UserStore};

/// Fields accepted when submitting a new event
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub capacity: u32,
    pub price_cents: i64,
    pub hall_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub image_path: Option<String>,
}

/// Full-replacement update of an event's mutable fields.
///
/// `image_path = None` keeps the current image.
#[derive(Debug, Clone)]
pub struct EventUpdate {
    pub title: String,
    pub description: String,
    pub capacity: u32,
    pub price_cents: i64,
    pub hall_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub image_path: Option<String>,
}

/// Fields accepted when updating a hall
#[derive(Debug, Clone)]
pub struct HallUpdate {
    pub name: String,
    pub location: String,
    pub capacity: u32,
}

/// Coordinates event approval, hall reservations, and their cascades
pub struct BookingEngine<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    gateway: &'a dyn PaymentGateway,
    media: &'a dyn MediaStore,
}

fn validate_slot(
    hall_id: Option<Uuid>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<()> {
    if hall_id.is_some() && (start.is_none() || end.is_none()) {
        return Err(Error::Validation(
            "a hall request needs both a start and an end date".into(),
        ));
    }
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(Error::Validation(
                "reservation window must start before it ends".into(),
            ));
        }
    }
    Ok(())
}

impl<'a> BookingEngine<'a> {
    pub fn new(
        db: &'a Database,
        clock: &'a dyn Clock,
        gateway: &'a dyn PaymentGateway,
        media: &'a dyn MediaStore,
    ) -> Self {
        Self {
            db,
            clock,
            gateway,
            media,
        }
    }

    // --- Event lifecycle ---

    /// Submit a new event for review.
    ///
    /// The event lands in `Pending`; no reservation is made until an admin
    /// approves it. A requested slot that already collides with a reserved
    /// window fails fast with `Conflict`.
    #[instrument(skip_all, fields(actor = %actor.user_id, title = %event.title))]
    pub fn create_event(&self, actor: &Actor, event: NewEvent) -> Result<Event> {
        CapabilityMatrix::require(actor, Capability::CreateEvent)?;

        if event.capacity == 0 {
            return Err(Error::Validation("event capacity must be positive".into()));
        }
        if event.price_cents < 0 {
            return Err(Error::Validation("event price must not be negative".into()));
        }
        validate_slot(event.hall_id, event.start_date, event.end_date)?;

        let tx = self.db.transaction()?;
        let events = EventStore::new(&tx);
        let halls = HallStore::new(&tx);
        let reservations = ReservationStore::new(&tx);

        if let (Some(hall_id), Some((start, end))) =
            (event.hall_id, event.start_date.zip(event.end_date))
        {
            halls
                .find_by_id(hall_id)?
                .ok_or_else(|| Error::NotFound(format!("hall {hall_id}")))?;

            if conflict::has_conflict(&reservations, hall_id, start, end, None)? {
                return Err(Error::Conflict(
                    "hall is already reserved for the selected time".into(),
                ));
            }
        }

        let now = self.clock.now();
        let mut record = Event::new(event.title, event.description, event.capacity, actor.user_id);
        record.price_cents = event.price_cents;
        record.hall_id = event.hall_id;
        record.start_date = event.start_date;
        record.end_date = event.end_date;
        record.image_path = event.image_path;
        record.created_at = now;
        record.updated_at = now;

        events.create(&record)?;
        tx.commit()?;

        info!(event_id = %record.id, "Event submitted for review");
        Ok(record)
    }

    /// Approve a pending or rejected event.
    ///
    /// Books the requested hall for the event's window; fails with
    /// `Conflict` when the window overlaps another reserved reservation
    /// and with `CapacityExceeded` when the event outgrows the hall. Any
    /// stale reservation held by this event is replaced, so re-approval
    /// after an edit is idempotent. Events without a hall are approved
    /// with no reservation side effects.
    #[instrument(skip_all, fields(actor = %actor.user_id, event_id = %event_id))]
    pub fn approve_event(&self, actor: &Actor, event_id: Uuid) -> Result<Event> {
        CapabilityMatrix::require(actor, Capability::ApproveEvent)?;

        let tx = self.db.transaction()?;
        let events = EventStore::new(&tx);
        let halls = HallStore::new(&tx);
        let reservations = ReservationStore::new(&tx);

        let mut event = events
            .find_by_id(event_id)?
            .ok_or_else(|| Error::NotFound(format!("event {event_id}")))?;

        if event.status == EventStatus::Approved {
            return Err(Error::Conflict("event is already approved".into()));
        }

        let now = self.clock.now();

        let Some(hall_id) = event.hall_id else {
            // No hall requested: approval is a pure status flip
            event.status = EventStatus::Approved;
            event.updated_at = now;
            events.update(&event)?;
            tx.commit()?;
            info!("Event approved without hall reservation");
            return Ok(event);
        };

        let (start, end) = event.window().ok_or_else(|| {
            Error::Validation("event requests a hall but has no reservation window".into())
        })?;

        if conflict::has_conflict(&reservations, hall_id, start, end, Some(event.id))? {
            return Err(Error::Conflict(
                "hall is already reserved for the requested time range".into(),
            ));
        }

        let hall = halls
            .find_by_id(hall_id)?
            .ok_or_else(|| Error::NotFound(format!("hall {hall_id}")))?;

        if event.capacity > hall.capacity {
            return Err(Error::CapacityExceeded(format!(
                "event capacity ({}) exceeds hall capacity ({})",
                event.capacity, hall.capacity
            )));
        }

        // Replace any reservation left over from a previous approval
        reservations.delete_by_event(event.id)?;
        let reservation = HallReservation::new(hall_id, event.id, start, end);
        reservations.create(&reservation)?;

        occupancy::recompute(&halls, &reservations, hall_id)?;

        event.status = EventStatus::Approved;
        event.updated_at = now;
        events.update(&event)?;

        invariants::assert_event_matches_reservation(&event, Some(&reservation));
        invariants::assert_reservations_disjoint(&reservations.list_for_hall(hall_id)?);

        tx.commit()?;
        info!(hall_id = %hall_id, "Event approved and hall reserved");
        Ok(event)
    }

    /// Reject an event.
    ///
    /// If the event held a reservation it is cancelled, the hall freed when
    /// no other reservation references it, and the event's hall reference
    /// cleared along with the forfeited slot. Rejecting twice fails with
    /// `Conflict`.
    #[instrument(skip_all, fields(actor = %actor.user_id, event_id = %event_id))]
    pub fn reject_event(&self, actor: &Actor, event_id: Uuid) -> Result<Event> {
        CapabilityMatrix::require(actor, Capability::RejectEvent)?;

        let tx = self.db.transaction()?;
        let events = EventStore::new(&tx);
        let halls = HallStore::new(&tx);
        let reservations = ReservationStore::new(&tx);

        let mut event = events
            .find_by_id(event_id)?
            .ok_or_else(|| Error::NotFound(format!("event {event_id}")))?;

        if event.status == EventStatus::Rejected {
            return Err(Error::Conflict("event is already rejected".into()));
        }

        if let Some(reservation) = reservations.delete_by_event(event.id)? {
            // The reservation's hall is authoritative, not the event field
            occupancy::recompute(&halls, &reservations, reservation.hall_id)?;
            event.hall_id = None;
        }

        event.status = EventStatus::Rejected;
        event.updated_at = self.clock.now();
        events.update(&event)?;

        tx.commit()?;
        info!("Event rejected");
        Ok(event)
    }

    /// Update an event's fields.
    ///
    /// Changing the hall or window of an approved event forfeits its
    /// reservation and demotes it to `Pending` for a fresh approval cycle;
    /// the new slot is conflict-checked up front (excluding the event's own
    /// reservation) so a doomed edit fails before anything moves. Slot
    /// changes on a not-yet-approved event are plain field updates.
    #[instrument(skip_all, fields(actor = %actor.user_id, event_id = %event_id))]
    pub fn update_event(&self, actor: &Actor, event_id: Uuid, update: EventUpdate) -> Result<Event> {
        CapabilityMatrix::require(actor, Capability::UpdateEvent)?;

        if update.capacity == 0 {
            return Err(Error::Validation("event capacity must be positive".into()));
        }
        if update.price_cents < 0 {
            return Err(Error::Validation("event price must not be negative".into()));
        }
        validate_slot(update.hall_id, update.start_date, update.end_date)?;

        let tx = self.db.transaction()?;
        let events = EventStore::new(&tx);
        let halls = HallStore::new(&tx);
        let reservations = ReservationStore::new(&tx);

        let mut event = events
            .find_by_id(event_id)?
            .ok_or_else(|| Error::NotFound(format!("event {event_id}")))?;

        CapabilityMatrix::require_owner_or_admin(actor, &event)?;

        if let Some(hall_id) = update.hall_id {
            halls
                .find_by_id(hall_id)?
                .ok_or_else(|| Error::NotFound(format!("hall {hall_id}")))?;
        }

        let slot_changed = update.hall_id != event.hall_id
            || update.start_date != event.start_date
            || update.end_date != event.end_date;

        if slot_changed && event.status == EventStatus::Approved {
            // Implicit re-approval request: vet the new slot first
            if let (Some(hall_id), Some((start, end))) = (
                update.hall_id,
                update.start_date.zip(update.end_date),
            ) {
                if conflict::has_conflict(&reservations, hall_id, start, end, Some(event.id))? {
                    return Err(Error::Conflict(
                        "hall is already reserved for the selected time".into(),
                    ));
                }
            }

            if let Some(old) = reservations.delete_by_event(event.id)? {
                occupancy::recompute(&halls, &reservations, old.hall_id)?;
            }

            event.status = EventStatus::Pending;
        }

        let replaced_image = match &update.image_path {
            Some(new_image) if event.image_path.as_deref() != Some(new_image.as_str()) => {
                event.image_path.take()
            }
            _ => None,
        };

        event.title = update.title;
        event.description = update.description;
        event.capacity = update.capacity;
        event.price_cents = update.price_cents;
        event.hall_id = update.hall_id;
        event.start_date = update.start_date;
        event.end_date = update.end_date;
        if let Some(image) = update.image_path {
            event.image_path = Some(image);
        }
        event.updated_at = self.clock.now();

        events.update(&event)?;
        tx.commit()?;

        if let Some(old_image) = replaced_image {
            self.media.delete(&old_image);
        }

        info!(status = %event.status, "Event updated");
        Ok(event)
    }

    /// Delete an event.
    ///
    /// Completed payments are refunded through the processor first; a
    /// refund failure aborts the delete with everything intact so an
    /// operator can retry. Then the reservation is cancelled, the hall
    /// freed if nothing else holds it, and the record (with its roster)
    /// removed. The stored image is released best-effort afterwards.
    #[instrument(skip_all, fields(actor = %actor.user_id, event_id = %event_id))]
    pub fn delete_event(&self, actor: &Actor, event_id: Uuid) -> Result<()> {
        CapabilityMatrix::require(actor, Capability::DeleteEvent)?;

        let event = self
            .db
            .events()
            .find_by_id(event_id)?
            .ok_or_else(|| Error::NotFound(format!("event {event_id}")))?;

        CapabilityMatrix::require_owner_or_admin(actor, &event)?;

        // Refunds run before, and outside, the deletion transaction: the
        // processor call must not hold a write transaction open, and its
        // failure must leave the event untouched.
        if !event.is_free() {
            for payment in self.db.payments().list_completed_for_event(event.id)? {
                if payment.payment_ref_id.is_none() {
                    warn!(payment_id = %payment.id, "Skipping refund: no processor reference");
                    continue;
                }
                refund_payment(&self.db.payments(), self.gateway, &payment)?;
            }
        }

        let tx = self.db.transaction()?;
        let events = EventStore::new(&tx);
        let halls = HallStore::new(&tx);
        let reservations = ReservationStore::new(&tx);

        if let Some(reservation) = reservations.delete_by_event(event.id)? {
            occupancy::recompute(&halls, &reservations, reservation.hall_id)?;
        }

        events.delete(event.id)?;
        tx.commit()?;

        if let Some(image) = &event.image_path {
            self.media.delete(image);
        }

        info!("Event deleted");
        Ok(())
    }

    // --- Hall administration ---

    /// Create a hall
    #[instrument(skip_all, fields(actor = %actor.user_id, name = %name))]
    pub fn create_hall(&self, actor: &Actor, name: String, location: String, capacity: u32) -> Result<Hall> {
        CapabilityMatrix::require(actor, Capability::ManageHalls)?;

        if capacity == 0 {
            return Err(Error::Validation("hall capacity must be positive".into()));
        }

        let hall = Hall::new(name, location, capacity);
        self.db.halls().create(&hall)?;

        info!(hall_id = %hall.id, "Hall created");
        Ok(hall)
    }

    /// Update a hall.
    ///
    /// Reducing capacity below an approved event's capacity fails with
    /// `Conflict`. The occupancy flag is re-derived from live reservations
    /// after the update, so no client-supplied status can contradict the
    /// reservation table.
    #[instrument(skip_all, fields(actor = %actor.user_id, hall_id = %hall_id))]
    pub fn update_hall(&self, actor: &Actor, hall_id: Uuid, update: HallUpdate) -> Result<Hall> {
        CapabilityMatrix::require(actor, Capability::ManageHalls)?;

        if update.capacity == 0 {
            return Err(Error::Validation("hall capacity must be positive".into()));
        }

        let tx = self.db.transaction()?;
        let events = EventStore::new(&tx);
        let halls = HallStore::new(&tx);
        let reservations = ReservationStore::new(&tx);

        let mut hall = halls
            .find_by_id(hall_id)?
            .ok_or_else(|| Error::NotFound(format!("hall {hall_id}")))?;

        if update.capacity < hall.capacity
            && events.any_approved_exceeding_capacity(hall_id, update.capacity)?
        {
            return Err(Error::Conflict(
                "cannot reduce hall capacity: approved events exceed the new capacity".into(),
            ));
        }

        hall.name = update.name;
        hall.location = update.location;
        hall.capacity = update.capacity;
        halls.update(&hall)?;

        hall.status = occupancy::recompute(&halls, &reservations, hall_id)?;

        tx.commit()?;
        info!("Hall updated");
        Ok(hall)
    }

    /// Delete a hall.
    ///
    /// Refused while any reservation or event still references it.
    #[instrument(skip_all, fields(actor = %actor.user_id, hall_id = %hall_id))]
    pub fn delete_hall(&self, actor: &Actor, hall_id: Uuid) -> Result<()> {
        CapabilityMatrix::require(actor, Capability::ManageHalls)?;

        let tx = self.db.transaction()?;
        let events = EventStore::new(&tx);
        let halls = HallStore::new(&tx);
        let reservations = ReservationStore::new(&tx);

        halls
            .find_by_id(hall_id)?
            .ok_or_else(|| Error::NotFound(format!("hall {hall_id}")))?;

        if reservations.any_reserved_for_hall(hall_id, None)? {
            return Err(Error::Conflict("hall still has active reservations".into()));
        }
        if events.any_referencing_hall(hall_id)? {
            return Err(Error::Conflict("events still reference this hall".into()));
        }

        halls.delete(hall_id)?;
        tx.commit()?;

        info!("Hall deleted");
        Ok(())
    }

    // --- User administration ---

    /// Delete a user account.
    ///
    /// Hosts with approved events and attendees holding completed payments
    /// on paid events are refused; their obligations must be unwound first.
    /// Otherwise the user's roster entries are removed with the account.
    #[instrument(skip_all, fields(actor = %actor.user_id, user_id = %user_id))]
    pub fn delete_user(&self, actor: &Actor, user_id: Uuid) -> Result<()> {
        CapabilityMatrix::require(actor, Capability::ManageUsers)?;

        if user_id == actor.user_id {
            return Err(Error::Forbidden("cannot delete your own account".into()));
        }

        let tx = self.db.transaction()?;
        let users = UserStore::new(&tx);
        let events = EventStore::new(&tx);
        let payments = PaymentStore::new(&tx);

        let user = users
            .find_by_id(user_id)?
            .ok_or_else(|| Error::NotFound(format!("user {user_id}")))?;

        match user.role {
            Role::Admin => {
                return Err(Error::Forbidden("cannot delete admin accounts".into()));
            }
            Role::Host => {
                if events.count_approved_for_host(user_id)? > 0 {
                    return Err(Error::Conflict(
                        "cannot delete a host with approved events".into(),
                    ));
                }
                // Unapproved submissions go with the account
                events.delete_all_for_host(user_id)?;
            }
            Role::User => {
                if payments.any_completed_paid_for_user(user_id)? {
                    return Err(Error::Conflict(
                        "user holds completed payments on paid events; refund or unregister first"
                            .into(),
                    ));
                }
            }
        }

        events.remove_all_registrations_for_user(user_id)?;
        users.delete(user_id)?;

        tx.commit()?;
        info!("User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::media::NullMediaStore;
    use crate::models::{HallStatus, Payment, PaymentStatus};
    use crate::payments::InMemoryGateway;
    use chrono::TimeZone;

    struct Fixture {
        db: Database,
        clock: FixedClock,
        gateway: InMemoryGateway,
        media: NullMediaStore,
        admin: Actor,
        host: Actor,
    }

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, min, 0).unwrap()
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let admin_user = crate::models::User::new("adm".into(), "adm@example.com".into(), Role::Admin);
        let host_user = crate::models::User::new("hst".into(), "hst@example.com".into(), Role::Host);
        db.users().create(&admin_user).unwrap();
        db.users().create(&host_user).unwrap();

        Fixture {
            db,
            clock: FixedClock::new(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()),
            gateway: InMemoryGateway::new(),
            media: NullMediaStore,
            admin: admin_user.actor(),
            host: host_user.actor(),
        }
    }

    impl Fixture {
        fn engine(&self) -> BookingEngine<'_> {
            BookingEngine::new(&self.db, &self.clock, &self.gateway, &self.media)
        }

        fn hall(&self, capacity: u32) -> Hall {
            self.engine()
                .create_hall(&self.admin, "Hall A".into(), "North wing".into(), capacity)
                .unwrap()
        }

        fn event(&self, capacity: u32, hall: Option<(Uuid, DateTime<Utc>, DateTime<Utc>)>) -> Event {
            let (hall_id, start, end) = match hall {
                Some((h, s, e)) => (Some(h), Some(s), Some(e)),
                None => (None, None, None),
            };
            self.engine()
                .create_event(
                    &self.host,
                    NewEvent {
                        title: "Banquet".into(),
                        description: "Dinner and speeches".into(),
                        capacity,
                        price_cents: 0,
                        hall_id,
                        start_date: start,
                        end_date: end,
                        image_path: None,
                    },
                )
                .unwrap()
        }

        fn update_for(&self, event: &Event) -> EventUpdate {
            EventUpdate {
                title: event.title.clone(),
                description: event.description.clone(),
                capacity: event.capacity,
                price_cents: event.price_cents,
                hall_id: event.hall_id,
                start_date: event.start_date,
                end_date: event.end_date,
                image_path: None,
            }
        }

        fn hall_status(&self, hall_id: Uuid) -> HallStatus {
            self.db.halls().find_by_id(hall_id).unwrap().unwrap().status
        }
    }

    #[test]
    fn test_approve_creates_reservation_and_reserves_hall() {
        let fx = fixture();
        let hall = fx.hall(50);
        let event = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));

        let approved = fx.engine().approve_event(&fx.admin, event.id).unwrap();
        assert_eq!(approved.status, EventStatus::Approved);

        let reservation = fx.db.reservations().find_by_event(event.id).unwrap().unwrap();
        assert_eq!(reservation.hall_id, hall.id);
        assert_eq!(reservation.start_date, at(10, 0));
        assert_eq!(fx.hall_status(hall.id), HallStatus::Reserved);
    }

    #[test]
    fn test_overlapping_approval_conflicts_and_leaves_no_reservation() {
        let fx = fixture();
        let hall = fx.hall(50);
        let x = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        fx.engine().approve_event(&fx.admin, x.id).unwrap();

        let y = fx.event(10, Some((hall.id, at(10, 30), at(11, 30))));
        let err = fx.engine().approve_event(&fx.admin, y.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(fx.db.reservations().find_by_event(y.id).unwrap().is_none());

        let refreshed = fx.db.events().find_by_id(y.id).unwrap().unwrap();
        assert_eq!(refreshed.status, EventStatus::Pending);
    }

    #[test]
    fn test_back_to_back_slot_approves_after_move() {
        let fx = fixture();
        let hall = fx.hall(50);
        let x = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        fx.engine().approve_event(&fx.admin, x.id).unwrap();

        // Y collides at first, then moves to the adjacent slot
        let y = fx.event(10, Some((hall.id, at(10, 30), at(11, 30))));
        assert!(fx.engine().approve_event(&fx.admin, y.id).is_err());

        let mut update = fx.update_for(&fx.db.events().find_by_id(y.id).unwrap().unwrap());
        update.start_date = Some(at(11, 0));
        update.end_date = Some(at(12, 0));
        fx.engine().update_event(&fx.host, y.id, update).unwrap();

        fx.engine().approve_event(&fx.admin, y.id).unwrap();

        assert_eq!(fx.db.reservations().list_for_hall(hall.id).unwrap().len(), 2);
        assert_eq!(fx.hall_status(hall.id), HallStatus::Reserved);
    }

    #[test]
    fn test_capacity_exceeded() {
        let fx = fixture();
        let hall = fx.hall(30);
        let event = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));

        let err = fx.engine().approve_event(&fx.admin, event.id).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded(_)));
        assert!(fx.db.reservations().find_by_event(event.id).unwrap().is_none());
    }

    #[test]
    fn test_approve_without_hall_is_pure_status_flip() {
        let fx = fixture();
        let event = fx.event(40, None);

        let approved = fx.engine().approve_event(&fx.admin, event.id).unwrap();
        assert_eq!(approved.status, EventStatus::Approved);
        assert!(fx.db.reservations().find_by_event(event.id).unwrap().is_none());
    }

    #[test]
    fn test_double_approval_rejected() {
        let fx = fixture();
        let event = fx.event(40, None);
        fx.engine().approve_event(&fx.admin, event.id).unwrap();

        let err = fx.engine().approve_event(&fx.admin, event.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_reapproval_after_rejection_replaces_reservation() {
        let fx = fixture();
        let hall = fx.hall(50);
        let event = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));

        fx.engine().approve_event(&fx.admin, event.id).unwrap();
        fx.engine().reject_event(&fx.admin, event.id).unwrap();
        assert_eq!(fx.hall_status(hall.id), HallStatus::Available);

        // Rejection cleared the hall reference; restore the slot and re-approve
        let mut update = fx.update_for(&fx.db.events().find_by_id(event.id).unwrap().unwrap());
        update.hall_id = Some(hall.id);
        update.start_date = Some(at(10, 0));
        update.end_date = Some(at(11, 0));
        fx.engine().update_event(&fx.host, event.id, update).unwrap();
        fx.engine().approve_event(&fx.admin, event.id).unwrap();

        assert_eq!(fx.db.reservations().list_for_hall(hall.id).unwrap().len(), 1);
        assert_eq!(fx.hall_status(hall.id), HallStatus::Reserved);
    }

    #[test]
    fn test_reject_sole_reservation_frees_hall() {
        let fx = fixture();
        let hall = fx.hall(50);
        let event = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        fx.engine().approve_event(&fx.admin, event.id).unwrap();

        let rejected = fx.engine().reject_event(&fx.admin, event.id).unwrap();
        assert_eq!(rejected.status, EventStatus::Rejected);
        assert_eq!(rejected.hall_id, None);
        assert!(fx.db.reservations().find_by_event(event.id).unwrap().is_none());
        assert_eq!(fx.hall_status(hall.id), HallStatus::Available);
    }

    #[test]
    fn test_reject_keeps_hall_reserved_for_sibling() {
        let fx = fixture();
        let hall = fx.hall(50);
        let x = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        let y = fx.event(10, Some((hall.id, at(11, 0), at(12, 0))));
        fx.engine().approve_event(&fx.admin, x.id).unwrap();
        fx.engine().approve_event(&fx.admin, y.id).unwrap();

        fx.engine().reject_event(&fx.admin, x.id).unwrap();
        assert_eq!(fx.hall_status(hall.id), HallStatus::Reserved);

        fx.engine().reject_event(&fx.admin, y.id).unwrap();
        assert_eq!(fx.hall_status(hall.id), HallStatus::Available);
    }

    #[test]
    fn test_double_rejection_fails() {
        let fx = fixture();
        let event = fx.event(40, None);
        fx.engine().reject_event(&fx.admin, event.id).unwrap();

        let err = fx.engine().reject_event(&fx.admin, event.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_slot_change_demotes_approved_event() {
        let fx = fixture();
        let hall = fx.hall(50);
        let event = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        fx.engine().approve_event(&fx.admin, event.id).unwrap();

        let mut update = fx.update_for(&fx.db.events().find_by_id(event.id).unwrap().unwrap());
        update.start_date = Some(at(14, 0));
        update.end_date = Some(at(15, 0));
        let updated = fx.engine().update_event(&fx.host, event.id, update).unwrap();

        assert_eq!(updated.status, EventStatus::Pending);
        assert!(fx.db.reservations().find_by_event(event.id).unwrap().is_none());
        assert_eq!(fx.hall_status(hall.id), HallStatus::Available);
    }

    #[test]
    fn test_slot_change_to_occupied_window_fails_before_demotion() {
        let fx = fixture();
        let hall = fx.hall(50);
        let x = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        let y = fx.event(10, Some((hall.id, at(12, 0), at(13, 0))));
        fx.engine().approve_event(&fx.admin, x.id).unwrap();
        fx.engine().approve_event(&fx.admin, y.id).unwrap();

        // Moving Y onto X's window must fail and leave Y fully intact
        let mut update = fx.update_for(&fx.db.events().find_by_id(y.id).unwrap().unwrap());
        update.start_date = Some(at(10, 30));
        update.end_date = Some(at(11, 30));
        let err = fx.engine().update_event(&fx.host, y.id, update).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let refreshed = fx.db.events().find_by_id(y.id).unwrap().unwrap();
        assert_eq!(refreshed.status, EventStatus::Approved);
        assert!(fx.db.reservations().find_by_event(y.id).unwrap().is_some());
    }

    #[test]
    fn test_non_slot_update_keeps_approval() {
        let fx = fixture();
        let hall = fx.hall(50);
        let event = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        fx.engine().approve_event(&fx.admin, event.id).unwrap();

        let mut update = fx.update_for(&fx.db.events().find_by_id(event.id).unwrap().unwrap());
        update.title = "Renamed banquet".into();
        update.capacity = 45;
        let updated = fx.engine().update_event(&fx.host, event.id, update).unwrap();

        assert_eq!(updated.status, EventStatus::Approved);
        assert!(fx.db.reservations().find_by_event(event.id).unwrap().is_some());
    }

    #[test]
    fn test_update_by_non_owner_forbidden() {
        let fx = fixture();
        let event = fx.event(40, None);

        let other_host = crate::models::User::new("h2".into(), "h2@example.com".into(), Role::Host);
        fx.db.users().create(&other_host).unwrap();

        let update = fx.update_for(&event);
        let err = fx
            .engine()
            .update_event(&other_host.actor(), event.id, update)
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_host_cannot_approve() {
        let fx = fixture();
        let event = fx.event(40, None);

        let err = fx.engine().approve_event(&fx.host, event.id).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_delete_event_frees_hall_and_removes_roster() {
        let fx = fixture();
        let hall = fx.hall(50);
        let event = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        fx.engine().approve_event(&fx.admin, event.id).unwrap();

        let attendee = crate::models::User::new("a".into(), "a@example.com".into(), Role::User);
        fx.db.users().create(&attendee).unwrap();
        fx.db
            .events()
            .add_registration(event.id, attendee.id, fx.clock.now())
            .unwrap();

        fx.engine().delete_event(&fx.host, event.id).unwrap();

        assert!(fx.db.events().find_by_id(event.id).unwrap().is_none());
        assert!(fx.db.reservations().find_by_event(event.id).unwrap().is_none());
        assert_eq!(fx.hall_status(hall.id), HallStatus::Available);
        assert_eq!(fx.db.events().count_registrations(event.id).unwrap(), 0);
    }

    #[test]
    fn test_delete_event_refunds_completed_payments_first() {
        let fx = fixture();
        let mut event = fx.event(40, None);
        event.price_cents = 2000;
        fx.db.events().update(&event).unwrap();

        let attendee = crate::models::User::new("a".into(), "a@example.com".into(), Role::User);
        fx.db.users().create(&attendee).unwrap();
        let payment = Payment::new(attendee.id, event.id, 2000, "sess_1".into());
        fx.db.payments().create(&payment).unwrap();
        fx.db.payments().mark_completed(payment.id, "ref_1").unwrap();

        fx.engine().delete_event(&fx.host, event.id).unwrap();

        assert_eq!(fx.gateway.refund_calls(), 1);
        let refreshed = fx.db.payments().find_by_id(payment.id).unwrap().unwrap();
        assert_eq!(refreshed.status, PaymentStatus::Refunded);
        assert!(fx.db.events().find_by_id(event.id).unwrap().is_none());
    }

    #[test]
    fn test_refund_failure_aborts_delete() {
        let fx = fixture();
        let mut event = fx.event(40, None);
        event.price_cents = 2000;
        fx.db.events().update(&event).unwrap();

        let attendee = crate::models::User::new("a".into(), "a@example.com".into(), Role::User);
        fx.db.users().create(&attendee).unwrap();
        let payment = Payment::new(attendee.id, event.id, 2000, "sess_1".into());
        fx.db.payments().create(&payment).unwrap();
        fx.db.payments().mark_completed(payment.id, "ref_1").unwrap();

        fx.gateway.fail_refunds(true);
        let err = fx.engine().delete_event(&fx.host, event.id).unwrap_err();
        assert!(matches!(err, Error::RefundFailed(_)));

        // Event and payment both survive for a retry
        assert!(fx.db.events().find_by_id(event.id).unwrap().is_some());
        let refreshed = fx.db.payments().find_by_id(payment.id).unwrap().unwrap();
        assert_eq!(refreshed.status, PaymentStatus::Completed);
    }

    #[test]
    fn test_create_event_rejects_bad_slot() {
        let fx = fixture();
        let hall = fx.hall(50);

        // Hall without window
        let err = fx
            .engine()
            .create_event(
                &fx.host,
                NewEvent {
                    title: "E".into(),
                    description: "d".into(),
                    capacity: 10,
                    price_cents: 0,
                    hall_id: Some(hall.id),
                    start_date: None,
                    end_date: None,
                    image_path: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Window ends before it starts
        let err = fx
            .engine()
            .create_event(
                &fx.host,
                NewEvent {
                    title: "E".into(),
                    description: "d".into(),
                    capacity: 10,
                    price_cents: 0,
                    hall_id: Some(hall.id),
                    start_date: Some(at(11, 0)),
                    end_date: Some(at(10, 0)),
                    image_path: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_create_event_probes_for_conflicts() {
        let fx = fixture();
        let hall = fx.hall(50);
        let x = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        fx.engine().approve_event(&fx.admin, x.id).unwrap();

        let err = fx
            .engine()
            .create_event(
                &fx.host,
                NewEvent {
                    title: "Clash".into(),
                    description: "d".into(),
                    capacity: 10,
                    price_cents: 0,
                    hall_id: Some(hall.id),
                    start_date: Some(at(10, 30)),
                    end_date: Some(at(11, 30)),
                    image_path: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_hall_capacity_reduction_guard() {
        let fx = fixture();
        let hall = fx.hall(50);
        let event = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        fx.engine().approve_event(&fx.admin, event.id).unwrap();

        let err = fx
            .engine()
            .update_hall(
                &fx.admin,
                hall.id,
                HallUpdate {
                    name: hall.name.clone(),
                    location: hall.location.clone(),
                    capacity: 30,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Reducing within bounds is fine
        let updated = fx
            .engine()
            .update_hall(
                &fx.admin,
                hall.id,
                HallUpdate {
                    name: hall.name.clone(),
                    location: hall.location.clone(),
                    capacity: 45,
                },
            )
            .unwrap();
        assert_eq!(updated.capacity, 45);
        assert_eq!(updated.status, HallStatus::Reserved);
    }

    #[test]
    fn test_delete_hall_guards() {
        let fx = fixture();
        let hall = fx.hall(50);
        let event = fx.event(40, Some((hall.id, at(10, 0), at(11, 0))));
        fx.engine().approve_event(&fx.admin, event.id).unwrap();

        let err = fx.engine().delete_hall(&fx.admin, hall.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        fx.engine().delete_event(&fx.host, event.id).unwrap();
        fx.engine().delete_hall(&fx.admin, hall.id).unwrap();
        assert!(fx.db.halls().find_by_id(hall.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_user_guards() {
        let fx = fixture();

        // Host with an approved event is protected
        let event = fx.event(40, None);
        fx.engine().approve_event(&fx.admin, event.id).unwrap();
        let err = fx.engine().delete_user(&fx.admin, fx.host.user_id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Attendee with a completed paid payment is protected
        let attendee = crate::models::User::new("a".into(), "a@example.com".into(), Role::User);
        fx.db.users().create(&attendee).unwrap();
        let mut paid = fx.event(40, None);
        paid.price_cents = 1500;
        fx.db.events().update(&paid).unwrap();
        let payment = Payment::new(attendee.id, paid.id, 1500, "sess_1".into());
        fx.db.payments().create(&payment).unwrap();
        fx.db.payments().mark_completed(payment.id, "ref_1").unwrap();

        let err = fx.engine().delete_user(&fx.admin, attendee.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // After the refund the account can go, roster entries included
        fx.db.payments().mark_refunded(payment.id).unwrap();
        fx.db
            .events()
            .add_registration(paid.id, attendee.id, fx.clock.now())
            .unwrap();
        fx.engine().delete_user(&fx.admin, attendee.id).unwrap();
        assert!(fx.db.users().find_by_id(attendee.id).unwrap().is_none());
        assert_eq!(fx.db.events().count_registrations(paid.id).unwrap(), 0);
    }

    #[test]
    fn test_delete_host_takes_pending_events_along() {
        let fx = fixture();
        let event = fx.event(40, None);

        fx.engine().delete_user(&fx.admin, fx.host.user_id).unwrap();

        assert!(fx.db.users().find_by_id(fx.host.user_id).unwrap().is_none());
        assert!(fx.db.events().find_by_id(event.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_user_refuses_self_and_admins() {
        let fx = fixture();

        let err = fx.engine().delete_user(&fx.admin, fx.admin.user_id).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let other_admin = crate::models::User::new("a2".into(), "a2@example.com".into(), Role::Admin);
        fx.db.users().create(&other_admin).unwrap();
        let err = fx.engine().delete_user(&fx.admin, other_admin.id).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }
}
