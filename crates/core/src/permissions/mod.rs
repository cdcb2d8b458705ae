//! Capability checks for lifecycle operations
//!
//! Each operation declares the roles it requires and checks once, up
//! front, before any mutation.

use crate::error::{Error, Result};
use crate::models::{Actor, Event, Role};

/// Operations the core can be asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    // Event lifecycle
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    ApproveEvent,
    RejectEvent,

    // Attendance
    RegisterForEvent,
    ConfirmRegistration,
    UnregisterFromEvent,

    // Administration
    ManageHalls,
    ManageUsers,
}

/// Role-to-capability matrix
pub struct CapabilityMatrix;

impl CapabilityMatrix {
    /// Check if a role may perform a capability
    pub fn can_perform(role: Role, capability: Capability) -> bool {
        match capability {
            // Hosts create and maintain their events; admins can step in
            Capability::CreateEvent => role >= Role::Host,
            Capability::UpdateEvent => role >= Role::Host,
            Capability::DeleteEvent => role >= Role::Host,

            // Review is admin-only
            Capability::ApproveEvent => role == Role::Admin,
            Capability::RejectEvent => role == Role::Admin,

            // Attendance is for regular users only
            Capability::RegisterForEvent => role == Role::User,
            Capability::ConfirmRegistration => role == Role::User,
            Capability::UnregisterFromEvent => role == Role::User,

            // Administration
            Capability::ManageHalls => role == Role::Admin,
            Capability::ManageUsers => role == Role::Admin,
        }
    }

    /// Require a capability, failing with `Forbidden` otherwise
    pub fn require(actor: &Actor, capability: Capability) -> Result<()> {
        if Self::can_perform(actor.role, capability) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "{} role may not perform {:?}",
                actor.role, capability
            )))
        }
    }

    /// Require that the actor owns the event or is an admin.
    ///
    /// Hosts may only touch their own events.
    pub fn require_owner_or_admin(actor: &Actor, event: &Event) -> Result<()> {
        if actor.role == Role::Admin || event.host_id == actor.user_id {
            Ok(())
        } else {
            Err(Error::Forbidden(
                "only the hosting user or an admin may modify this event".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_admin_capabilities() {
        assert!(CapabilityMatrix::can_perform(Role::Admin, Capability::ApproveEvent));
        assert!(CapabilityMatrix::can_perform(Role::Admin, Capability::RejectEvent));
        assert!(CapabilityMatrix::can_perform(Role::Admin, Capability::ManageHalls));
        assert!(CapabilityMatrix::can_perform(Role::Admin, Capability::CreateEvent));
    }

    #[test]
    fn test_host_capabilities() {
        assert!(CapabilityMatrix::can_perform(Role::Host, Capability::CreateEvent));
        assert!(!CapabilityMatrix::can_perform(Role::Host, Capability::ApproveEvent));
        assert!(!CapabilityMatrix::can_perform(Role::Host, Capability::RegisterForEvent));
        assert!(!CapabilityMatrix::can_perform(Role::Host, Capability::ManageHalls));
    }

    #[test]
    fn test_user_capabilities() {
        assert!(CapabilityMatrix::can_perform(Role::User, Capability::RegisterForEvent));
        assert!(CapabilityMatrix::can_perform(Role::User, Capability::UnregisterFromEvent));
        assert!(!CapabilityMatrix::can_perform(Role::User, Capability::CreateEvent));
        assert!(!CapabilityMatrix::can_perform(Role::User, Capability::ApproveEvent));
    }

    #[test]
    fn test_ownership_check() {
        let host_id = Uuid::new_v4();
        let event = Event::new("E".into(), "d".into(), 10, host_id);

        let owner = Actor::new(host_id, Role::Host);
        let other = Actor::new(Uuid::new_v4(), Role::Host);
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);

        assert!(CapabilityMatrix::require_owner_or_admin(&owner, &event).is_ok());
        assert!(CapabilityMatrix::require_owner_or_admin(&admin, &event).is_ok());
        assert!(CapabilityMatrix::require_owner_or_admin(&other, &event).is_err());
    }
}
