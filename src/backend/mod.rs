//! # Backend Contract - External Collaborator Traits
//!
//! The board delegates all persistence and authentication to two external
//! collaborators: an identity provider (credential verification, session
//! issuance) and a schemaless document store. This module defines their
//! contracts as async traits; the orchestration code in [`crate::board`]
//! only ever sees these seams.
//!
//! ## Collaborators
//!
//! - [`IdentityProvider`] - account creation, authentication, sign-out, and
//!   a session-change subscription that fires on load and after every
//!   login/logout or session restore.
//! - [`DocumentStore`] - named collections of key-value documents with
//!   keyed writes, auto-id inserts, keyed reads, and ordered queries.
//!
//! ## Server timestamps
//!
//! Creation times are assigned by the store, not the caller. A caller puts
//! [`server_timestamp()`] into a field and the store substitutes the current
//! UTC time when the write lands.
//!
//! ## Error reporting
//!
//! [`AuthError`] messages are shown to the user verbatim; there is no
//! error-code translation layer on top of them.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

pub mod local;

/// A provider-issued identity for an authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque provider-issued id; keys the `users` profile document.
    pub uid: String,
    pub email: String,
}

/// Session-change notifications delivered through [`IdentityProvider::subscribe`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn(Identity),
    SignedOut,
}

/// Identity-provider failures. The `Display` text is the user-facing
/// message, reported verbatim.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("An account with this email already exists.")]
    EmailInUse,

    #[error("Incorrect email or password.")]
    InvalidCredentials,

    #[error("Backend error: {0}")]
    Backend(String),
}

/// A schemaless document: named fields with JSON values.
pub type Document = serde_json::Map<String, Value>;

/// Sentinel replaced by the store with the current UTC time at write.
const SERVER_TIMESTAMP_SENTINEL: &str = "__server_timestamp__";

/// Field value requesting a store-assigned timestamp.
pub fn server_timestamp() -> Value {
    Value::String(SERVER_TIMESTAMP_SENTINEL.to_string())
}

/// Whether a field value is the server-timestamp sentinel.
pub fn is_server_timestamp(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == SERVER_TIMESTAMP_SENTINEL)
}

/// Sort direction for [`DocumentStore::query_collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// External identity provider contract.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and establish a session for it. The provider
    /// enforces email uniqueness.
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Verify credentials and establish a session.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// End the current session, if any.
    async fn end_session(&self) -> Result<(), AuthError>;

    /// The currently signed-in identity, if a session is active.
    fn current_identity(&self) -> Option<Identity>;

    /// Subscribe to session changes. The receiver is primed with the current
    /// state (so the subscription fires on load, including restored
    /// sessions) and then receives an event after every login and logout.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent>;
}

/// External document store contract.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write (create or replace) a document under a known id.
    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
    ) -> anyhow::Result<()>;

    /// Insert a document under a generated id; returns the id.
    async fn add_document(&self, collection: &str, doc: Document) -> anyhow::Result<String>;

    /// Read a document by id. `Ok(None)` when absent.
    async fn read_document(&self, collection: &str, id: &str) -> anyhow::Result<Option<Document>>;

    /// Return all documents in a collection ordered by a field. The store
    /// has no substring query support; any finer filtering happens
    /// client-side.
    async fn query_collection(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
    ) -> anyhow::Result<Vec<Document>>;
}
