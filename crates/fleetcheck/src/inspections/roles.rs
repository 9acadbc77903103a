use serde::{Deserialize, Serialize};

use super::domain::UserId;

/// Ordered user roles. The numeric rank drives every level check; membership
/// in an item's `editable_roles` set drives per-item edit permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    GroupLeader,
    Organizer,
    Admin,
}

/// Roles permitted to edit an item when none are configured explicitly.
pub const DEFAULT_EDITABLE_ROLES: [Role; 2] = [Role::Organizer, Role::Admin];

impl Role {
    pub const fn rank(self) -> u8 {
        match self {
            Role::User => 1,
            Role::GroupLeader => 2,
            Role::Organizer => 3,
            Role::Admin => 4,
        }
    }

    pub const fn has_level(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Membership test against an item's editable-role set. An empty set
    /// falls back to [`DEFAULT_EDITABLE_ROLES`].
    pub fn can_edit(self, allowed: &[Role]) -> bool {
        if allowed.is_empty() {
            DEFAULT_EDITABLE_ROLES.contains(&self)
        } else {
            allowed.contains(&self)
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::GroupLeader => "group_leader",
            Role::Organizer => "organizer",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "group_leader" => Some(Role::GroupLeader),
            "organizer" => Some(Role::Organizer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The acting user supplied by the identity collaborator. The role is
/// required; there is no "missing role" state anywhere in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: UserId,
    pub role: Role,
}

impl ActingUser {
    /// An execution may be mutated by the user who started it or by anyone
    /// at organizer level and above.
    pub fn may_manage_execution(&self, owner: UserId) -> bool {
        self.id == owner || self.role.has_level(Role::Organizer)
    }
}
