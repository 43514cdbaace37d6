//! Authenticated principal supplied by the auth collaborator.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A buyer browsing and placing orders.
    Consumer,
    /// A seller listing and fulfilling items.
    Farmer,
    /// Platform operator with elevated permissions.
    Admin,
}

impl Role {
    /// Parses a role from its wire name.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "consumer" => Some(Role::Consumer),
            "farmer" => Some(Role::Farmer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Returns the role name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Consumer => "consumer",
            Role::Farmer => "farmer",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authenticated caller.
///
/// The core trusts this value as delivered by the upstream auth layer and
/// never re-authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The authenticated user's ID.
    pub id: UserId,
    /// The authenticated user's role.
    pub role: Role,
}

impl Principal {
    /// Creates a principal.
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Returns true for admin principals.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
