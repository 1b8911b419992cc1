//! Roles and section visibility.
//!
//! The board uses a closed role enumeration with a total order. Higher roles
//! imply a superset of lower capabilities, so visibility and posting checks
//! are threshold comparisons rather than string equality chains.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level attached to a user profile at registration.
///
/// Ordering is `User < Driver < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Driver,
    Admin,
}

impl Role {
    /// Parse a stored role string. Returns `None` for anything outside the
    /// closed set; callers treat that as an unrecognized role (nothing
    /// visible, warning logged) rather than guessing.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "driver" => Some(Role::Driver),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// The wire/storage spelling of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Driver => "driver",
            Role::Admin => "admin",
        }
    }

    /// Posting listings requires at least `Driver`.
    pub fn can_post(&self) -> bool {
        *self >= Role::Driver
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three role-gated panels of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    User,
    Driver,
    Admin,
}

impl Panel {
    /// All panels, highest privilege first (display order of the page).
    pub const ALL: [Panel; 3] = [Panel::Admin, Panel::Driver, Panel::User];

    /// Minimum role required to see this panel.
    pub fn required_role(&self) -> Role {
        match self {
            Panel::User => Role::User,
            Panel::Driver => Role::Driver,
            Panel::Admin => Role::Admin,
        }
    }

    /// Whether `role` may see this panel. Monotonic by construction: a
    /// higher role sees everything a lower one does.
    pub fn visible_to(&self, role: Role) -> bool {
        role >= self.required_role()
    }
}
