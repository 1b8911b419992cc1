//! # Auth Flow
//!
//! Registration, login, and logout against the identity provider, plus the
//! session-event spine that keeps the UI honest. The local handlers never
//! flip the UI themselves: they trigger the provider action and let the
//! session-change subscription drive [`reduce`], the single source of UI
//! truth, so racing handlers cannot diverge the page.
//!
//! Registration writes the `users/{uid}` profile after the account is
//! created. The two steps are not transactional: a failed profile write
//! leaves an authenticated identity without a profile. The login path
//! compensates by defaulting such identities to the least-privileged role.

use log::{error, info, warn};
use serde_json::Value;

use super::roles::Role;
use super::session::{AuthState, Session};
use super::view::{self, AuthForm, RenderCommand, Tone};
use crate::backend::{
    server_timestamp, Document, DocumentStore, Identity, IdentityProvider, SessionEvent,
};
use crate::logutil::escape_log;
use crate::validation::validate_password;

/// Collection holding user profiles, keyed by provider uid.
pub const USERS_COLLECTION: &str = "users";

/// Receives user-facing outcome messages from the auth operations. The
/// console binds one per form message area; tests record into a `Vec`.
pub trait MessageSink {
    fn message(&mut self, tone: Tone, text: &str);
}

impl MessageSink for Vec<(Tone, String)> {
    fn message(&mut self, tone: Tone, text: &str) {
        self.push((tone, text.to_string()));
    }
}

/// Register an account with the given role and write its profile document.
///
/// A password shorter than six characters fails locally with a fixed
/// message; the provider is never contacted in that case.
///
/// The target role is caller-supplied and unchecked here: the only surface
/// offering [`Role::Driver`] is the admin panel, which is hidden from
/// non-admins at the view level. That UI-only gating is a trust-boundary
/// gap inherited from the design, not an enforcement point.
pub async fn register<I, D>(
    provider: &I,
    store: &D,
    email: &str,
    password: &str,
    role: Role,
    sink: &mut dyn MessageSink,
) where
    I: IdentityProvider + ?Sized,
    D: DocumentStore + ?Sized,
{
    if let Err(e) = validate_password(password) {
        warn!(
            "Registration attempt failed, password too short: {} ({})",
            escape_log(email),
            role
        );
        sink.message(Tone::Error, &e.to_string());
        return;
    }

    info!("Registering {} as {}", escape_log(email), role);
    let identity = match provider.create_account(email, password).await {
        Ok(identity) => identity,
        Err(e) => {
            error!("Registration failed for {}: {}", escape_log(email), e);
            sink.message(Tone::Error, &format!("Registration failed: {}", e));
            return;
        }
    };

    let mut profile = Document::new();
    profile.insert("email".to_string(), Value::String(identity.email.clone()));
    profile.insert("role".to_string(), Value::String(role.as_str().to_string()));
    profile.insert("createdAt".to_string(), server_timestamp());

    if let Err(e) = store
        .write_document(USERS_COLLECTION, &identity.uid, profile)
        .await
    {
        // Known gap: the account now exists without a profile. Login
        // degrades such identities to the 'user' role.
        error!(
            "Profile write failed after account creation, uid {} has no profile: {}",
            identity.uid, e
        );
        sink.message(Tone::Error, &format!("Registration failed: {}", e));
        return;
    }

    info!(
        "User registered with profile: {} uid={} role={}",
        escape_log(&identity.email),
        identity.uid,
        role
    );
    sink.message(
        Tone::Success,
        &format!(
            "Registration successful! User {} created as {}.",
            identity.email, role
        ),
    );
}

/// Authenticate and report the outcome. On success the profile is read for
/// the welcome message (missing profile yields a distinct degraded
/// message); the session itself is updated by the event spine, not here.
/// On failure the session role is cleared and the provider's error message
/// is reported verbatim.
pub async fn login<I, D>(
    provider: &I,
    store: &D,
    session: &mut Session,
    email: &str,
    password: &str,
    sink: &mut dyn MessageSink,
) where
    I: IdentityProvider + ?Sized,
    D: DocumentStore + ?Sized,
{
    info!("Login attempt for {}", escape_log(email));
    let identity = match provider.authenticate(email, password).await {
        Ok(identity) => identity,
        Err(e) => {
            error!("Login failed for {}: {}", escape_log(email), e);
            session.apply(AuthState::SignedOut);
            sink.message(Tone::Error, &format!("Login failed: {}", e));
            return;
        }
    };

    match read_profile(store, &identity.uid).await {
        ProfileLookup::Found { role_raw, role } => {
            let shown = role.map(|r| r.as_str().to_string()).unwrap_or(role_raw);
            info!(
                "Login successful for {} with role {}",
                escape_log(&identity.email),
                escape_log(&shown)
            );
            sink.message(
                Tone::Success,
                &format!("Login successful! Welcome, {} ({}).", identity.email, shown),
            );
        }
        ProfileLookup::Missing => {
            warn!(
                "Profile not found for logged-in user {}, defaulting to 'user' role",
                escape_log(&identity.email)
            );
            sink.message(
                Tone::Degraded,
                "Login successful, but profile missing. Defaulting to 'user' role.",
            );
        }
    }
}

/// End the session. On failure the error is reported and the session is
/// left untouched; on success the signed-out event performs the UI reset.
pub async fn logout<I>(provider: &I, sink: &mut dyn MessageSink)
where
    I: IdentityProvider + ?Sized,
{
    info!("Logout initiated");
    match provider.end_session().await {
        Ok(()) => info!("Logout successful"),
        Err(e) => {
            error!("Logout failed: {}", e);
            sink.message(Tone::Error, &format!("Logout failed: {}", e));
        }
    }
}

enum ProfileLookup {
    Found {
        /// Raw stored role string, kept for display when unrecognized.
        role_raw: String,
        role: Option<Role>,
    },
    Missing,
}

async fn read_profile<D: DocumentStore + ?Sized>(store: &D, uid: &str) -> ProfileLookup {
    match store.read_document(USERS_COLLECTION, uid).await {
        Ok(Some(doc)) => {
            let role_raw = doc
                .get("role")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let role = Role::parse(&role_raw);
            if role.is_none() {
                warn!("Profile for uid {} carries unrecognized role '{}'", uid, escape_log(&role_raw));
            }
            ProfileLookup::Found { role_raw, role }
        }
        Ok(None) => ProfileLookup::Missing,
        Err(e) => {
            // A failed read degrades like a missing profile rather than
            // blocking sign-in.
            error!("Profile read failed for uid {}: {}", uid, e);
            ProfileLookup::Missing
        }
    }
}

/// A session event with the profile lookup already performed, so the
/// reducer below stays a pure function of its inputs.
#[derive(Debug, Clone)]
pub enum ResolvedEvent {
    SignedIn {
        identity: Identity,
        /// `None` means the profile carried an unrecognized role.
        role: Option<Role>,
        profile_missing: bool,
    },
    SignedOut,
}

/// Resolve a provider event: look up the profile and default a missing one
/// to the least-privileged role.
pub async fn resolve_event<D: DocumentStore + ?Sized>(
    store: &D,
    event: SessionEvent,
) -> ResolvedEvent {
    match event {
        SessionEvent::SignedOut => ResolvedEvent::SignedOut,
        SessionEvent::SignedIn(identity) => match read_profile(store, &identity.uid).await {
            ProfileLookup::Found { role, .. } => ResolvedEvent::SignedIn {
                identity,
                role,
                profile_missing: false,
            },
            ProfileLookup::Missing => {
                warn!(
                    "No profile for {} during session change, defaulting to 'user' role",
                    escape_log(&identity.email)
                );
                ResolvedEvent::SignedIn {
                    identity,
                    role: Some(Role::User),
                    profile_missing: true,
                }
            }
        },
    }
}

/// The spine: fold a resolved session event into the session and produce
/// the render commands that bring the page in line with it.
///
/// Signed-in: record the role, reveal main content, apply role panel
/// visibility, and request an unfiltered listing refresh. Signed-out: clear
/// the session, collapse to the auth view, and default to the login form.
pub fn reduce(resolved: &ResolvedEvent, session: &mut Session) -> Vec<RenderCommand> {
    match resolved {
        ResolvedEvent::SignedIn {
            identity,
            role,
            profile_missing,
        } => {
            info!("Session change: signed in as {}", escape_log(&identity.email));
            session.apply(AuthState::SignedIn {
                uid: identity.uid.clone(),
                email: identity.email.clone(),
                role: *role,
                profile_missing: *profile_missing,
            });

            let label = if *profile_missing {
                format!("Logged in as: {} (user - profile missing!)", identity.email)
            } else {
                match role {
                    Some(role) => format!("Logged in as: {} ({})", identity.email, role),
                    None => format!("Logged in as: {} (unrecognized role)", identity.email),
                }
            };

            let mut commands = vec![RenderCommand::SetIdentityLabel(Some(label))];
            commands.extend(view::toggle_app_visibility(true));
            commands.extend(view::display_content_by_role(*role));
            commands.push(RenderCommand::RefreshListings {
                source: String::new(),
                destination: String::new(),
            });
            commands
        }
        ResolvedEvent::SignedOut => {
            info!("Session change: signed out");
            session.apply(AuthState::SignedOut);
            let mut commands = view::toggle_app_visibility(false);
            commands.extend(view::show_auth_form(AuthForm::Login));
            commands
        }
    }
}
