//! # Busboard - A Role-Based Bus Information Board
//!
//! Busboard is a small bus-information board: riders register and log in,
//! the page shows panels gated by role (user/driver/admin), drivers and
//! admins post bus listings, and everyone searches listings by route
//! substring. Authentication and persistence are delegated to an external
//! identity provider and document store, expressed as trait seams with a
//! file-backed reference implementation.
//!
//! ## Features
//!
//! - **Role-Gated UI**: A closed, totally ordered role model
//!   (user < driver < admin); panel visibility and posting rights are
//!   threshold checks, monotonic by privilege.
//! - **Provider-Driven Sessions**: The identity provider's session-change
//!   stream is the single source of UI truth; it fires on load, restores
//!   persisted sessions, and drives every render after login/logout.
//! - **Degraded Paths**: An authenticated identity without a profile
//!   defaults to the least-privileged role with a distinct message.
//! - **Client-Side Route Search**: The store orders by timestamp; the
//!   case-insensitive substring search over routes runs locally.
//! - **Pluggable Backend**: `IdentityProvider` and `DocumentStore` traits
//!   with a local backend (Argon2id credentials, JSON documents, atomic
//!   locked writes).
//! - **Async Design**: Built with Tokio; one logical event loop, no
//!   blocking calls.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use busboard::backend::local::LocalBackend;
//! use busboard::board::ConsoleApp;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = Arc::new(LocalBackend::new("./data").await?);
//!     let app = ConsoleApp::new(backend.clone(), backend);
//!     app.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`board`] - Core board logic: roles, session, view, auth, listings,
//!   posting, console front-end
//! - [`backend`] - External collaborator contracts and the local reference
//!   backend
//! - [`config`] - Configuration management
//! - [`validation`] - Local input validation with fixed user-facing
//!   messages
//! - [`logutil`] - Log sanitation helpers

pub mod backend;
pub mod board;
pub mod config;
pub mod logutil;
pub mod validation;
