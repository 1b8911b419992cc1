//! # Console Front-End
//!
//! A line-oriented stand-in for the board's web page. It owns an in-memory
//! page model (the passive view), binds the provider's session-event stream
//! to the auth spine, and maps typed commands onto the same interactions
//! the page exposes: the two auth forms, the role panels, the post form,
//! and the two-field route search with a clear action.
//!
//! In-flight fetches are not cancelled or sequenced when a new interaction
//! starts one; completions settle in arrival order (last-settled-wins),
//! matching the board's event model.

use anyhow::Result;
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::auth::{self, MessageSink};
use super::listings::{self, ListingDraft, ListingPage};
use super::posting::{self, PostError};
use super::roles::Role;
use super::session::Session;
use super::view::{self, AuthForm, MessageArea, Region, Render, RenderCommand, Tone};
use crate::backend::{DocumentStore, IdentityProvider};
use crate::logutil::escape_log;

/// In-memory model of the page the render commands act on.
#[derive(Debug, Default)]
pub struct Page {
    visible: HashSet<Region>,
    messages: HashMap<MessageArea, (Tone, String)>,
    identity_label: Option<String>,
    listings: Option<ListingPage>,
    pub search_source: String,
    pub search_destination: String,
    pub post_inputs: ListingDraft,
    pub driver_register_email: String,
    pub driver_register_password: String,
}

impl Page {
    pub fn new() -> Self {
        Page::default()
    }

    pub fn is_visible(&self, region: Region) -> bool {
        self.visible.contains(&region)
    }

    pub fn message(&self, area: MessageArea) -> Option<&(Tone, String)> {
        self.messages.get(&area)
    }

    pub fn identity_label(&self) -> Option<&str> {
        self.identity_label.as_deref()
    }

    pub fn listings(&self) -> Option<&ListingPage> {
        self.listings.as_ref()
    }
}

impl Render for Page {
    fn apply(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::Show(region) => {
                self.visible.insert(region);
            }
            RenderCommand::Hide(region) => {
                self.visible.remove(&region);
            }
            RenderCommand::SetMessage { area, tone, text } => {
                self.messages.insert(area, (tone, text));
            }
            RenderCommand::ClearMessage(area) => {
                self.messages.remove(&area);
            }
            RenderCommand::SetIdentityLabel(label) => {
                self.identity_label = label;
            }
            RenderCommand::ClearPostInputs => {
                self.post_inputs = ListingDraft::default();
            }
            RenderCommand::ClearDriverRegisterInputs => {
                self.driver_register_email.clear();
                self.driver_register_password.clear();
            }
            RenderCommand::ClearSearchInputs => {
                self.search_source.clear();
                self.search_destination.clear();
            }
            RenderCommand::RenderListings(page) => {
                self.listings = Some(page);
            }
            RenderCommand::RefreshListings { .. } => {
                // Refreshes are executed by the hosting loop, which replaces
                // this command with a RenderListings before it gets here.
                debug!("RefreshListings reached the page model; ignored");
            }
        }
    }
}

/// Message sink bound to one of the page's message areas.
struct AreaSink<'a> {
    page: &'a mut Page,
    area: MessageArea,
}

impl MessageSink for AreaSink<'_> {
    fn message(&mut self, tone: Tone, text: &str) {
        self.page.apply(RenderCommand::SetMessage {
            area: self.area,
            tone,
            text: text.to_string(),
        });
    }
}

/// The interactive board application.
pub struct ConsoleApp<I, D>
where
    I: IdentityProvider + ?Sized,
    D: DocumentStore + ?Sized,
{
    provider: Arc<I>,
    store: Arc<D>,
    session: Session,
    page: Page,
}

impl<I, D> ConsoleApp<I, D>
where
    I: IdentityProvider + ?Sized,
    D: DocumentStore + ?Sized,
{
    pub fn new(provider: Arc<I>, store: Arc<D>) -> Self {
        ConsoleApp {
            provider,
            store,
            session: Session::new(),
            page: Page::new(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Apply commands to the page, executing listing refreshes along the way.
    async fn dispatch(&mut self, commands: Vec<RenderCommand>) {
        for command in commands {
            if let RenderCommand::RefreshListings {
                source,
                destination,
            } = command
            {
                match listings::fetch_listings(self.store.as_ref(), &source, &destination).await {
                    Ok(page) => self.page.apply(RenderCommand::RenderListings(page)),
                    Err(e) => {
                        // Leave the previous display in place; the user can
                        // retry the search.
                        error!("Listing refresh failed: {}", e);
                    }
                }
            } else {
                self.page.apply(command);
            }
        }
    }

    /// Feed one provider session event through the spine.
    pub async fn handle_event(&mut self, event: crate::backend::SessionEvent) {
        let resolved = auth::resolve_event(self.store.as_ref(), event).await;
        let commands = auth::reduce(&resolved, &mut self.session);
        self.dispatch(commands).await;
    }

    /// Switch the visible auth form.
    pub async fn show_form(&mut self, which: AuthForm) {
        self.dispatch(view::show_auth_form(which)).await;
    }

    /// The register form's submit (always the `user` role).
    pub async fn register_user(&mut self, email: &str, password: &str) {
        let mut sink = AreaSink {
            page: &mut self.page,
            area: MessageArea::Register,
        };
        auth::register(
            self.provider.as_ref(),
            self.store.as_ref(),
            email,
            password,
            Role::User,
            &mut sink,
        )
        .await;
    }

    /// The admin panel's driver-registration submit. Available only while
    /// the admin panel is visible; that visibility is the sole gate, as on
    /// the page.
    pub async fn register_driver(&mut self, email: &str, password: &str) {
        if !self.page.is_visible(Region::AdminPanel) {
            warn!("Driver registration attempted without the admin panel visible");
            println!("That control is not available.");
            return;
        }
        self.page.driver_register_email = email.to_string();
        self.page.driver_register_password = password.to_string();
        info!("Admin initiated driver registration for {}", escape_log(email));
        let mut sink = AreaSink {
            page: &mut self.page,
            area: MessageArea::AdminRegister,
        };
        auth::register(
            self.provider.as_ref(),
            self.store.as_ref(),
            email,
            password,
            Role::Driver,
            &mut sink,
        )
        .await;
        self.page.apply(RenderCommand::ClearDriverRegisterInputs);
    }

    pub async fn login(&mut self, email: &str, password: &str) {
        let mut sink = AreaSink {
            page: &mut self.page,
            area: MessageArea::Login,
        };
        auth::login(
            self.provider.as_ref(),
            self.store.as_ref(),
            &mut self.session,
            email,
            password,
            &mut sink,
        )
        .await;
    }

    pub async fn logout(&mut self) {
        let mut sink = AreaSink {
            page: &mut self.page,
            area: MessageArea::Login,
        };
        auth::logout(self.provider.as_ref(), &mut sink).await;
    }

    /// The post form's submit: fill the inputs, run the gate, and on
    /// success clear the form and refresh with the current search filters.
    pub async fn post(&mut self, draft: ListingDraft) {
        self.page.post_inputs = draft.clone();
        match posting::submit_listing(&self.session, self.store.as_ref(), &draft).await {
            Ok(id) => {
                debug!("Listing {} written", id);
                let refresh = RenderCommand::RefreshListings {
                    source: self.page.search_source.clone(),
                    destination: self.page.search_destination.clone(),
                };
                self.dispatch(vec![RenderCommand::ClearPostInputs, refresh]).await;
            }
            Err(e @ (PostError::NotSignedIn
            | PostError::InsufficientRole
            | PostError::MissingFields)) => {
                self.page.apply(RenderCommand::SetMessage {
                    area: MessageArea::Post,
                    tone: Tone::Error,
                    text: e.to_string(),
                });
            }
            Err(PostError::Backend(e)) => {
                error!("Listing write failed: {}", e);
                self.page.apply(RenderCommand::SetMessage {
                    area: MessageArea::Post,
                    tone: Tone::Error,
                    text: "Error posting bus information. Please try again.".to_string(),
                });
            }
        }
    }

    /// The search bar's submit.
    pub async fn search(&mut self, source: &str, destination: &str) {
        info!(
            "Search requested: source=\"{}\" destination=\"{}\"",
            escape_log(source),
            escape_log(destination)
        );
        self.page.search_source = source.to_string();
        self.page.search_destination = destination.to_string();
        self.dispatch(vec![RenderCommand::RefreshListings {
            source: source.to_string(),
            destination: destination.to_string(),
        }])
        .await;
    }

    /// The clear-search action: empty both fields and refetch everything.
    pub async fn clear_search(&mut self) {
        info!("Search cleared");
        self.dispatch(vec![
            RenderCommand::ClearSearchInputs,
            RenderCommand::RefreshListings {
                source: String::new(),
                destination: String::new(),
            },
        ])
        .await;
    }

    /// Run the interactive loop: provider events and stdin commands
    /// interleave on this one task.
    pub async fn run(mut self) -> Result<()> {
        let mut events = self.provider.subscribe();
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        println!("busboard console. Type 'help' for commands.");

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            self.handle_event(event).await;
                            self.print_page();
                        }
                        None => break,
                    }
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if !self.command(&line).await {
                                break;
                            }
                            self.print_page();
                        }
                        None => break,
                    }
                }
            }
        }
        info!("Console session ended");
        Ok(())
    }

    /// Parse and execute one command line. Returns `false` to quit.
    pub async fn command(&mut self, line: &str) -> bool {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((v, r)) => (v, r.trim()),
            None => (line, ""),
        };

        match verb {
            "" => {}
            "help" => print_help(),
            "show" => match rest {
                "login" => self.show_form(AuthForm::Login).await,
                "register" => self.show_form(AuthForm::Register).await,
                _ => println!("Usage: show login|register"),
            },
            "register" => match split_pair(rest) {
                Some((email, password)) => self.register_user(email, password).await,
                None => println!("Usage: register <email> <password>"),
            },
            "register-driver" => match split_pair(rest) {
                Some((email, password)) => self.register_driver(email, password).await,
                None => println!("Usage: register-driver <email> <password>"),
            },
            "login" => match split_pair(rest) {
                Some((email, password)) => self.login(email, password).await,
                None => println!("Usage: login <email> <password>"),
            },
            "logout" => self.logout().await,
            "post" => {
                let fields: Vec<&str> = rest.split(';').collect();
                if fields.len() == 4 {
                    let draft = ListingDraft {
                        bus_number: fields[0].trim().to_string(),
                        bus_route: fields[1].trim().to_string(),
                        bus_type: fields[2].trim().to_string(),
                        contact_info: fields[3].trim().to_string(),
                    };
                    self.post(draft).await;
                } else {
                    println!("Usage: post <number>;<route>;<type>;<contact>");
                }
            }
            "search" => {
                let (source, destination) = match rest.split_once(';') {
                    Some((s, d)) => (s.trim(), d.trim()),
                    None => (rest, ""),
                };
                self.search(source, destination).await;
            }
            "clear" => self.clear_search().await,
            "whoami" => match self.page.identity_label() {
                Some(label) => println!("{}", label),
                None => println!("Not signed in."),
            },
            "quit" | "exit" => return false,
            other => println!("Unknown command '{}'. Type 'help'.", other),
        }
        true
    }

    fn print_page(&self) {
        println!("----------------------------------------");
        if let Some(label) = self.page.identity_label() {
            println!("{}", label);
        }
        if self.page.is_visible(Region::AuthSection) {
            if self.page.is_visible(Region::LoginForm) {
                println!("[login form]");
            }
            if self.page.is_visible(Region::RegisterForm) {
                println!("[register form]");
            }
        }
        for (area, label) in [
            (MessageArea::Login, "login"),
            (MessageArea::Register, "register"),
            (MessageArea::AdminRegister, "admin"),
            (MessageArea::Post, "post"),
        ] {
            if let Some((tone, text)) = self.page.message(area) {
                println!("[{}:{}] {}", label, tone_label(*tone), text);
            }
        }
        if self.page.is_visible(Region::MainContent) {
            for (region, label) in [
                (Region::AdminPanel, "admin panel"),
                (Region::DriverPanel, "driver panel"),
                (Region::UserPanel, "user panel"),
            ] {
                if self.page.is_visible(region) {
                    println!("[{}]", label);
                }
            }
            match self.page.listings() {
                Some(ListingPage::BackendEmpty) => {
                    println!("No bus information available yet. Post one above!");
                }
                Some(ListingPage::NoMatches) => {
                    println!("No buses found matching your search criteria.");
                }
                Some(ListingPage::Cards(cards)) => {
                    println!("Available Buses:");
                    for card in cards {
                        println!(
                            "  Bus {} | {} | {} | {} | posted by {} on {}",
                            card.bus_number,
                            card.bus_route,
                            card.bus_type,
                            card.contact_info,
                            card.posted_by,
                            card.posted_at
                        );
                    }
                }
                None => {}
            }
        }
    }
}

fn tone_label(tone: Tone) -> &'static str {
    match tone {
        Tone::Success => "ok",
        Tone::Error => "error",
        Tone::Degraded => "warn",
    }
}

fn split_pair(rest: &str) -> Option<(&str, &str)> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Some((a, b)),
        _ => None,
    }
}

fn print_help() {
    println!("Commands:");
    println!("  show login|register        switch auth forms");
    println!("  register <email> <pass>    create a rider account");
    println!("  login <email> <pass>       sign in");
    println!("  logout                     sign out");
    println!("  post <no>;<route>;<type>;<contact>   post a listing (driver/admin)");
    println!("  search <source>[;<dest>]   filter listings by route substring");
    println!("  clear                      clear search and show everything");
    println!("  register-driver <email> <pass>       admin panel action");
    println!("  whoami                     show the signed-in identity");
    println!("  quit                       leave");
}
