use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// Account role. Owners list farmhouses, admins moderate everything.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Owner,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Owner => write!(f, "owner"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this account may publish farmhouse listings.
    pub fn can_list_properties(&self) -> bool {
        matches!(self.role, Role::Owner | Role::Admin)
    }
}

/// The capacity in which an actor touches a booking.
///
/// Resolved once per operation from the actor, the property owner and the
/// booking's guest. A property owner who also booked their own farmhouse acts
/// as the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    PropertyOwner,
    Admin,
    Guest,
    Denied,
}

impl Access {
    pub fn resolve(actor: &User, owner_id: UserId, guest_id: UserId) -> Self {
        if actor.id == owner_id {
            Self::PropertyOwner
        } else if actor.is_admin() {
            Self::Admin
        } else if actor.id == guest_id {
            Self::Guest
        } else {
            Self::Denied
        }
    }

    /// Owner-side powers: confirm, reject, complete, cancel without refund.
    pub fn manages_property(self) -> bool {
        matches!(self, Self::PropertyOwner | Self::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            email: "asha@example.com".into(),
            phone: "+91-9000000000".into(),
            role,
        }
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Owner).unwrap();
        assert_eq!(json, "\"owner\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn only_owners_and_admins_list_properties() {
        assert!(!user(Role::User).can_list_properties());
        assert!(user(Role::Owner).can_list_properties());
        assert!(user(Role::Admin).can_list_properties());
    }

    #[test]
    fn access_prefers_owner_over_guest() {
        let owner = user(Role::Owner);
        let access = Access::resolve(&owner, owner.id, owner.id);
        assert_eq!(access, Access::PropertyOwner);
        assert!(access.manages_property());
    }

    #[test]
    fn access_for_admin_guest_and_stranger() {
        let admin = user(Role::Admin);
        let guest = user(Role::User);
        let stranger = user(Role::User);
        let owner_id = Uuid::new_v4();

        assert_eq!(Access::resolve(&admin, owner_id, guest.id), Access::Admin);
        assert_eq!(Access::resolve(&guest, owner_id, guest.id), Access::Guest);
        assert_eq!(
            Access::resolve(&stranger, owner_id, guest.id),
            Access::Denied
        );
        assert!(!Access::Guest.manages_property());
    }
}
