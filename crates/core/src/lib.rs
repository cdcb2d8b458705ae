//! Banquet Core Library
//!
//! Hall reservation and event lifecycle engine: interval conflict
//! detection, the approval state machine and its cascades, derived hall
//! occupancy, payment/refund reconciliation, and the expiry sweep.

pub mod booking;
pub mod clock;
pub mod error;
pub mod invariants;
pub mod media;
pub mod models;
pub mod payments;
pub mod permissions;
pub mod registration;
pub mod storage;
pub mod sweeper;

pub use booking::{BookingEngine, EventUpdate, HallUpdate, NewEvent};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use media::{FsMediaStore, MediaStore, NullMediaStore};
pub use models::*;
pub use payments::{CheckoutSession, InMemoryGateway, PaymentGateway};
pub use permissions::{Capability, CapabilityMatrix};
pub use registration::{RegistrationCoordinator, RegistrationOutcome};
pub use storage::{Database, EventStore, HallStore, PaymentStore, ReservationStore, UserStore};
pub use sweeper::{sweep_expired_reservations, SweepSummary};
