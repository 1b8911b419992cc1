//! Test utilities & fixtures shared by the integration tests.

use busboard::backend::{AuthError, Identity, IdentityProvider, SessionEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Identity provider double that counts calls, for asserting that local
/// validation short-circuits before the provider is contacted.
#[derive(Default)]
pub struct CountingProvider {
    pub create_calls: AtomicUsize,
    pub auth_calls: AtomicUsize,
}

#[allow(dead_code)]
impl CountingProvider {
    pub fn created(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn authenticated(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for CountingProvider {
    async fn create_account(&self, email: &str, _password: &str) -> Result<Identity, AuthError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Identity {
            uid: format!("mock-{}", email),
            email: email.to_string(),
        })
    }

    async fn authenticate(&self, email: &str, _password: &str) -> Result<Identity, AuthError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Identity {
            uid: format!("mock-{}", email),
            email: email.to_string(),
        })
    }

    async fn end_session(&self) -> Result<(), AuthError> {
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        None
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(SessionEvent::SignedOut);
        rx
    }
}
