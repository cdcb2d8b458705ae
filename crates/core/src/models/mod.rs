//! Core data models

mod event;
mod hall;
mod payment;
mod reservation;
mod user;

pub use event::{Event, EventStatus};
pub use hall::{Hall, HallStatus};
pub use payment::{Payment, PaymentStatus};
pub use reservation::{HallReservation, ReservationStatus};
pub use user::{Actor, Role, User};
