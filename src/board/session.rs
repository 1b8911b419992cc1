//! # Session State
//!
//! One session object per run holds the authenticated identity and its
//! resolved role. It replaces the original design's process-wide mutable
//! role slot: components read it, and only [`Session::apply`] writes it,
//! driven by the auth flow's session-event handler (plus the explicit
//! clear on a failed login). That keeps the provider's notifications the
//! single source of truth and avoids divergent state from racing handlers.

use chrono::{DateTime, Utc};
use log::debug;

use super::roles::Role;
use crate::logutil::escape_log;

/// Authentication state machine.
///
/// `SignedOut → SignedIn` via a successful login or a restored session;
/// `SignedIn → SignedOut` via logout or provider-initiated session loss.
/// `SigningIn` is transient while an authenticate call is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SigningIn,
    SignedIn {
        uid: String,
        email: String,
        /// Resolved role. `None` means the profile carried an unrecognized
        /// role string; such a session sees no role panels and cannot post.
        /// A *missing* profile instead defaults to `Some(Role::User)` with
        /// `profile_missing` set.
        role: Option<Role>,
        profile_missing: bool,
    },
}

/// Per-run session state.
#[derive(Debug, Clone)]
pub struct Session {
    state: AuthState,
    started_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    /// Fresh session, signed out until authentication resolves.
    pub fn new() -> Self {
        Session {
            state: AuthState::SignedOut,
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The single setter. All transitions flow through here.
    pub fn apply(&mut self, next: AuthState) {
        if self.state != next {
            debug!(
                "Session transition: {} -> {}",
                describe(&self.state),
                describe(&next)
            );
        }
        self.state = next;
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self.state, AuthState::SignedIn { .. })
    }

    /// Resolved role, if signed in with a recognized role.
    pub fn role(&self) -> Option<Role> {
        match &self.state {
            AuthState::SignedIn { role, .. } => *role,
            _ => None,
        }
    }

    /// Email of the signed-in identity.
    pub fn email(&self) -> Option<&str> {
        match &self.state {
            AuthState::SignedIn { email, .. } => Some(email.as_str()),
            _ => None,
        }
    }

    /// Signed-in identity pair (uid, email), used when stamping listings.
    pub fn identity(&self) -> Option<(&str, &str)> {
        match &self.state {
            AuthState::SignedIn { uid, email, .. } => Some((uid.as_str(), email.as_str())),
            _ => None,
        }
    }
}

fn describe(state: &AuthState) -> String {
    match state {
        AuthState::SignedOut => "signed-out".to_string(),
        AuthState::SigningIn => "signing-in".to_string(),
        AuthState::SignedIn { email, role, .. } => format!(
            "signed-in({}, {})",
            escape_log(email),
            role.map(|r| r.as_str()).unwrap_or("unrecognized")
        ),
    }
}
