//! # View Controller
//!
//! The rendering layer is a passive collaborator: the board never touches it
//! directly. View operations here produce lists of [`RenderCommand`]s and a
//! [`Render`] implementation applies them to whatever surface hosts the
//! board (the console page in [`super::console`], a recording fake in
//! tests). Listing refreshes ride the same command list so the host loop
//! stays the only place that performs backend calls.

use log::{info, warn};

use super::listings::ListingPage;
use super::roles::{Panel, Role};

/// The two authentication forms; exactly one is visible at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthForm {
    Login,
    Register,
}

/// Named UI regions the controller shows and hides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    AuthSection,
    LoginForm,
    RegisterForm,
    MainContent,
    AdminPanel,
    DriverPanel,
    UserPanel,
}

impl Region {
    pub fn for_panel(panel: Panel) -> Region {
        match panel {
            Panel::Admin => Region::AdminPanel,
            Panel::Driver => Region::DriverPanel,
            Panel::User => Region::UserPanel,
        }
    }
}

/// Message areas attached to the page's forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageArea {
    Login,
    Register,
    AdminRegister,
    Post,
}

/// Presentation tone of a message. Which color or style a tone maps to is
/// the renderer's business, not part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    /// Partial success, e.g. logged in with a missing profile.
    Degraded,
}

/// Imperative instructions for the passive view.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Show(Region),
    Hide(Region),
    SetMessage {
        area: MessageArea,
        tone: Tone,
        text: String,
    },
    ClearMessage(MessageArea),
    /// Header label for the signed-in identity; `None` clears it.
    SetIdentityLabel(Option<String>),
    ClearPostInputs,
    ClearDriverRegisterInputs,
    ClearSearchInputs,
    RenderListings(ListingPage),
    /// Ask the host loop to fetch listings with these filters and render
    /// the result.
    RefreshListings { source: String, destination: String },
}

/// Surface that applies render commands.
pub trait Render {
    fn apply(&mut self, command: RenderCommand);

    fn apply_all(&mut self, commands: Vec<RenderCommand>) {
        for command in commands {
            self.apply(command);
        }
    }
}

/// Show one auth form and hide the other, clearing the hidden form's
/// message area.
pub fn show_auth_form(which: AuthForm) -> Vec<RenderCommand> {
    info!("Showing {} form", match which {
        AuthForm::Login => "login",
        AuthForm::Register => "register",
    });
    match which {
        AuthForm::Login => vec![
            RenderCommand::Show(Region::LoginForm),
            RenderCommand::Hide(Region::RegisterForm),
            RenderCommand::ClearMessage(MessageArea::Register),
        ],
        AuthForm::Register => vec![
            RenderCommand::Show(Region::RegisterForm),
            RenderCommand::Hide(Region::LoginForm),
            RenderCommand::ClearMessage(MessageArea::Login),
        ],
    }
}

/// Switch between the authentication view and the main app content.
///
/// `authenticated = false` is the single authoritative logged-out reset: it
/// also clears the identity label and collapses all three role panels. The
/// session role itself is cleared by the auth flow's event handler in the
/// same step.
pub fn toggle_app_visibility(authenticated: bool) -> Vec<RenderCommand> {
    info!("Toggling main app visibility, authenticated={}", authenticated);
    if authenticated {
        vec![
            RenderCommand::Hide(Region::AuthSection),
            RenderCommand::Show(Region::MainContent),
        ]
    } else {
        vec![
            RenderCommand::Show(Region::AuthSection),
            RenderCommand::Hide(Region::MainContent),
            RenderCommand::SetIdentityLabel(None),
            RenderCommand::Hide(Region::AdminPanel),
            RenderCommand::Hide(Region::DriverPanel),
            RenderCommand::Hide(Region::UserPanel),
        ]
    }
}

/// Show the role panels a role may see, hiding the rest. The mapping is
/// monotonic by privilege: admin ⊇ driver ⊇ user. `None` (an unrecognized
/// role string in the profile) shows nothing.
pub fn display_content_by_role(role: Option<Role>) -> Vec<RenderCommand> {
    let mut commands: Vec<RenderCommand> = Panel::ALL
        .iter()
        .map(|p| RenderCommand::Hide(Region::for_panel(*p)))
        .collect();
    match role {
        Some(role) => {
            info!("Adjusting panel visibility for role: {}", role);
            for panel in Panel::ALL {
                if panel.visible_to(role) {
                    commands.push(RenderCommand::Show(Region::for_panel(panel)));
                }
            }
        }
        None => {
            warn!("Unrecognized role; no role panels displayed");
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn shown_panels(role: Option<Role>) -> HashSet<Region> {
        display_content_by_role(role)
            .into_iter()
            .filter_map(|c| match c {
                RenderCommand::Show(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn role_visibility_monotonic() {
        let user = shown_panels(Some(Role::User));
        let driver = shown_panels(Some(Role::Driver));
        let admin = shown_panels(Some(Role::Admin));

        assert_eq!(user, HashSet::from([Region::UserPanel]));
        assert_eq!(driver, HashSet::from([Region::DriverPanel, Region::UserPanel]));
        assert_eq!(
            admin,
            HashSet::from([Region::AdminPanel, Region::DriverPanel, Region::UserPanel])
        );
        assert!(user.is_subset(&driver));
        assert!(driver.is_subset(&admin));
    }

    #[test]
    fn unrecognized_role_shows_nothing() {
        assert!(shown_panels(None).is_empty());
        // but all three panels are still explicitly hidden
        let hides = display_content_by_role(None)
            .into_iter()
            .filter(|c| matches!(c, RenderCommand::Hide(_)))
            .count();
        assert_eq!(hides, 3);
    }

    #[test]
    fn form_switch_clears_other_message() {
        let to_login = show_auth_form(AuthForm::Login);
        assert!(to_login.contains(&RenderCommand::ClearMessage(MessageArea::Register)));
        assert!(to_login.contains(&RenderCommand::Hide(Region::RegisterForm)));

        let to_register = show_auth_form(AuthForm::Register);
        assert!(to_register.contains(&RenderCommand::ClearMessage(MessageArea::Login)));
        assert!(to_register.contains(&RenderCommand::Hide(Region::LoginForm)));
    }

    #[test]
    fn logged_out_reset_collapses_everything() {
        let commands = toggle_app_visibility(false);
        assert!(commands.contains(&RenderCommand::SetIdentityLabel(None)));
        for region in [Region::AdminPanel, Region::DriverPanel, Region::UserPanel] {
            assert!(commands.contains(&RenderCommand::Hide(region)));
        }
        assert!(commands.contains(&RenderCommand::Hide(Region::MainContent)));
        assert!(commands.contains(&RenderCommand::Show(Region::AuthSection)));
    }
}
