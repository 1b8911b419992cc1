//! # Local Reference Backend
//!
//! A file-backed implementation of both backend contracts so the board runs
//! without an external service. Credentials live under `accounts/` with
//! Argon2id password hashes; document collections live under
//! `docs/<collection>/` as one JSON file per document; the active session is
//! persisted in `session.json` so it restores on the next load.
//!
//! ```text
//! data/
//! ├── accounts/       ← credential records (argon2 hash + uid)
//! ├── docs/
//! │   ├── users/      ← profile documents keyed by uid
//! │   └── buses/      ← listing documents keyed by generated id
//! └── session.json    ← persisted active session (restore-on-load)
//! ```
//!
//! Writes go through an exclusive file lock and an atomic temp-file rename.

use anyhow::{anyhow, Result};
use argon2::{Argon2, Params};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use log::warn;
use password_hash::{PasswordHasher, PasswordVerifier};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{
    is_server_timestamp, AuthError, Direction, Document, DocumentStore, Identity,
    IdentityProvider, SessionEvent,
};

/// Credential record stored per account under `accounts/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    uid: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// Persisted session slot (`session.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    uid: String,
    email: String,
}

/// File-backed identity provider + document store.
pub struct LocalBackend {
    data_dir: PathBuf,
    argon2: Argon2<'static>,
    session: Mutex<Option<Identity>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
}

impl LocalBackend {
    /// Open (or initialize) a backend rooted at `data_dir`, restoring any
    /// persisted session.
    pub async fn new(data_dir: &str) -> Result<Self> {
        Self::new_with_params(data_dir, None).await
    }

    /// Open with explicit Argon2 parameters (from the security config).
    pub async fn new_with_params(data_dir: &str, params: Option<Params>) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .map_err(|e| anyhow!("Failed to create data directory {}: {}", data_dir, e))?;
        let accounts_dir = Path::new(data_dir).join("accounts");
        let docs_dir = Path::new(data_dir).join("docs");
        fs::create_dir_all(&accounts_dir).await?;
        fs::create_dir_all(&docs_dir).await?;

        let argon2 = match params {
            Some(p) => Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, p),
            None => Argon2::default(),
        };

        let session = Self::load_session(data_dir).await?;
        Ok(LocalBackend {
            data_dir: PathBuf::from(data_dir),
            argon2,
            session: Mutex::new(session),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    async fn load_session(data_dir: &str) -> Result<Option<Identity>> {
        let path = Path::new(data_dir).join("session.json");
        match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<SessionRecord>(&content) {
                Ok(rec) => Ok(Some(Identity {
                    uid: rec.uid,
                    email: rec.email,
                })),
                Err(e) => {
                    warn!("Discarding corrupt session file {:?}: {}", path, e);
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!("Failed to read session file {:?}: {}", path, e)),
        }
    }

    fn account_path(&self, email: &str) -> PathBuf {
        let safe = utf8_percent_encode(email.trim(), NON_ALPHANUMERIC).to_string();
        self.data_dir.join("accounts").join(format!("{}.json", safe))
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.data_dir.join("docs").join(collection)
    }

    async fn read_account(&self, email: &str) -> Result<Option<AccountRecord>> {
        let path = self.account_path(email);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!("Failed to read account file {:?}: {}", path, e)),
        }
    }

    /// Replace the session slot, persist it, and notify subscribers.
    async fn set_session(&self, identity: Option<Identity>) -> Result<()> {
        {
            let mut slot = self
                .session
                .lock()
                .map_err(|_| anyhow!("Session slot poisoned"))?;
            *slot = identity.clone();
        }
        match &identity {
            Some(id) => {
                let rec = SessionRecord {
                    uid: id.uid.clone(),
                    email: id.email.clone(),
                };
                let json = serde_json::to_string_pretty(&rec)?;
                Self::write_file_locked(&self.session_path(), &json).await?;
            }
            None => {
                let path = self.session_path();
                match fs::remove_file(&path).await {
                    Ok(_) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(anyhow!("Failed to clear session file: {}", e)),
                }
            }
        }
        self.notify(match identity {
            Some(id) => SessionEvent::SignedIn(id),
            None => SessionEvent::SignedOut,
        });
        Ok(())
    }

    fn notify(&self, event: SessionEvent) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Substitute server-timestamp sentinels with the current UTC time.
    fn stamp_document(mut doc: Document) -> Document {
        let now = Utc::now().to_rfc3339();
        for (_, value) in doc.iter_mut() {
            if is_server_timestamp(value) {
                *value = Value::String(now.clone());
            }
        }
        doc
    }

    /// Write content to a file with an exclusive lock and an atomic
    /// temp-file rename.
    async fn write_file_locked(path: &Path, content: &str) -> Result<()> {
        use std::fs::{self, File, OpenOptions};
        use std::io::Write;

        // fs2 locks are synchronous; writes here are small.
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        lock_file.lock_exclusive()?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let base = path.file_name().and_then(|s| s.to_str()).unwrap_or("data.json");
        let mut counter = 0u32;
        let tmp_path = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut tmp) => {
                    tmp.write_all(content.as_bytes())?;
                    tmp.flush()?;
                    let _ = tmp.sync_all();
                    break candidate;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                    continue;
                }
                Err(e) => return Err(anyhow!("Failed to create temp file for atomic write: {}", e)),
            }
        };
        fs::rename(&tmp_path, path)?;
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        drop(lock_file);
        Ok(())
    }

    fn timestamp_key(doc: &Document, field: &str) -> Option<DateTime<Utc>> {
        doc.get(field)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[async_trait]
impl IdentityProvider for LocalBackend {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = email.trim();
        let existing = self
            .read_account(email)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        if existing.is_some() {
            return Err(AuthError::EmailInUse);
        }

        let salt = password_hash::SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Backend(format!("Password hash failure: {e}")))?;
        let record = AccountRecord {
            uid: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: hash.to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        Self::write_file_locked(&self.account_path(email), &json)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let identity = Identity {
            uid: record.uid,
            email: record.email,
        };
        // Creating an account establishes a session for it, as the external
        // provider does; the session-change stream announces the switch.
        self.set_session(Some(identity.clone()))
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        Ok(identity)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let record = self
            .read_account(email.trim())
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed = password_hash::PasswordHash::new(&record.password_hash)
            .map_err(|e| AuthError::Backend(format!("Corrupt password hash: {e}")))?;
        if self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Err(AuthError::InvalidCredentials);
        }

        let identity = Identity {
            uid: record.uid,
            email: record.email,
        };
        self.set_session(Some(identity.clone()))
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        Ok(identity)
    }

    async fn end_session(&self) -> Result<(), AuthError> {
        self.set_session(None)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))
    }

    fn current_identity(&self) -> Option<Identity> {
        self.session.lock().ok().and_then(|slot| slot.clone())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Prime with the current state so the subscription fires on load.
        let initial = match self.current_identity() {
            Some(id) => SessionEvent::SignedIn(id),
            None => SessionEvent::SignedOut,
        };
        let _ = tx.send(initial);
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }
}

#[async_trait]
impl DocumentStore for LocalBackend {
    async fn write_document(&self, collection: &str, id: &str, doc: Document) -> Result<()> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir).await?;
        let doc = Self::stamp_document(doc);
        let json = serde_json::to_string_pretty(&Value::Object(doc))?;
        Self::write_file_locked(&dir.join(format!("{}.json", id)), &json).await
    }

    async fn add_document(&self, collection: &str, doc: Document) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.write_document(collection, &id, doc).await?;
        Ok(id)
    }

    async fn read_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let path = self.collection_dir(collection).join(format!("{}.json", id));
        match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => Ok(Some(map)),
                _ => Err(anyhow!("Document {:?} is not an object", path)),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!("Failed to read document {:?}: {}", path, e)),
        }
    }

    async fn query_collection(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
    ) -> Result<Vec<Document>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut docs: Vec<Document> = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(entry.path()).await {
                Ok(content) => match serde_json::from_str::<Value>(&content) {
                    Ok(Value::Object(map)) => docs.push(map),
                    Ok(_) | Err(_) => {
                        warn!("Skipping unparsable document file: {:?}", entry.path());
                    }
                },
                Err(e) => warn!("Failed to read document file {:?}: {}", entry.path(), e),
            }
        }

        // Documents without the order field sort last regardless of direction.
        docs.sort_by(|a, b| {
            let ka = Self::timestamp_key(a, order_by);
            let kb = Self::timestamp_key(b, order_by);
            match (ka, kb) {
                (Some(ta), Some(tb)) => match direction {
                    Direction::Ascending => ta.cmp(&tb),
                    Direction::Descending => tb.cmp(&ta),
                },
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pairs: &[(&str, Value)]) -> Document {
        let mut d = Document::new();
        for (k, v) in pairs {
            d.insert(k.to_string(), v.clone());
        }
        d
    }

    #[test]
    fn server_timestamp_is_substituted_once() {
        tokio_test::block_on(async {
            let tmp = tempfile::tempdir().unwrap();
            let backend = LocalBackend::new(tmp.path().to_str().unwrap()).await.unwrap();
            let id = backend
                .add_document(
                    "buses",
                    doc(&[
                        ("busNumber", json!("42")),
                        ("timestamp", super::super::server_timestamp()),
                    ]),
                )
                .await
                .unwrap();
            let stored = backend.read_document("buses", &id).await.unwrap().unwrap();
            let ts = stored.get("timestamp").and_then(Value::as_str).unwrap();
            assert!(DateTime::parse_from_rfc3339(ts).is_ok());
        });
    }

    #[test]
    fn account_create_then_authenticate() {
        tokio_test::block_on(async {
            let tmp = tempfile::tempdir().unwrap();
            let backend = LocalBackend::new(tmp.path().to_str().unwrap()).await.unwrap();
            let created = backend
                .create_account("alice@example.com", "secret1")
                .await
                .unwrap();
            let authed = backend
                .authenticate("alice@example.com", "secret1")
                .await
                .unwrap();
            assert_eq!(created.uid, authed.uid);
            assert!(matches!(
                backend.authenticate("alice@example.com", "wrong").await,
                Err(AuthError::InvalidCredentials)
            ));
            assert!(matches!(
                backend.create_account("alice@example.com", "secret2").await,
                Err(AuthError::EmailInUse)
            ));
        });
    }

    #[test]
    fn session_restores_on_reopen() {
        tokio_test::block_on(async {
            let tmp = tempfile::tempdir().unwrap();
            let dir = tmp.path().to_str().unwrap();
            {
                let backend = LocalBackend::new(dir).await.unwrap();
                backend.create_account("bob@example.com", "secret1").await.unwrap();
                assert!(backend.current_identity().is_some());
            }
            let reopened = LocalBackend::new(dir).await.unwrap();
            let restored = reopened.current_identity().expect("session restored");
            assert_eq!(restored.email, "bob@example.com");

            reopened.end_session().await.unwrap();
            let cold = LocalBackend::new(dir).await.unwrap();
            assert!(cold.current_identity().is_none());
        });
    }
}
