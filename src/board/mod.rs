//! # Board Module - Core Application Logic
//!
//! Everything between the backend seams and the rendering surface lives
//! here: the role model, per-run session state, the view controller's
//! render commands, the auth flow and its session-event spine, the listing
//! repository with its client-side route search, the posting gate, and the
//! console front-end that ties them together.
//!
//! The spine is the control-flow backbone: the identity provider's
//! session-change stream fires on load and after every login/logout, and
//! [`auth::reduce`] turns each resolved event into the render commands
//! that bring the page in line. Interactive flows (posting, search) layer
//! on the same session state.

pub mod auth;
pub mod console;
pub mod listings;
pub mod posting;
pub mod roles;
pub mod session;
pub mod view;

pub use auth::{MessageSink, ResolvedEvent};
pub use console::{ConsoleApp, Page};
pub use listings::{ListingCard, ListingDraft, ListingPage};
pub use posting::PostError;
pub use roles::{Panel, Role};
pub use session::{AuthState, Session};
pub use view::{AuthForm, MessageArea, Region, Render, RenderCommand, Tone};
