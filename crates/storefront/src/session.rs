//! Client-side session persistence.
//!
//! The storefront keeps a small signed-in marker so an authenticated
//! session survives a reload. Only the customer's email and the OAuth
//! refresh token are persisted; passwords are never written anywhere.
//! Restoring a session exchanges the refresh token for a fresh access
//! token, and a stale token simply falls back to an anonymous session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bookstall_core::Email;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persisted session marker.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub email: Email,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("email", &self.email)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Backing store for the session marker. Implementations decide where
/// the marker lives (memory, disk, a browser storage bridge).
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Option<StoredSession>;
    fn store(&self, session: &StoredSession);
    fn clear(&self);
}

/// In-memory storage, used in tests and as the default.
#[derive(Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<StoredSession>>,
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Option<StoredSession> {
        self.slot.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn store(&self, session: &StoredSession) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(session.clone());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

/// The live session state plus its persistence.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    current: Mutex<Option<Email>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            current: Mutex::new(None),
        }
    }

    /// The persisted marker, if any. Called once at startup so the auth
    /// controller can attempt a silent re-login.
    #[must_use]
    pub fn hydrate(&self) -> Option<StoredSession> {
        self.storage.load()
    }

    /// Record a successful login and persist the marker.
    pub fn set_login(&self, email: Email, refresh_token: Option<&SecretString>) {
        self.storage.store(&StoredSession {
            email: email.clone(),
            refresh_token: refresh_token.map(|t| t.expose_secret().to_string()),
        });
        if let Ok(mut current) = self.current.lock() {
            *current = Some(email);
        }
        debug!("Session persisted");
    }

    /// Drop both the live state and the persisted marker.
    pub fn clear(&self) {
        self.storage.clear();
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }

    /// The signed-in customer's email, if any.
    #[must_use]
    pub fn email(&self) -> Option<Email> {
        self.current.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Whether a customer is signed in.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.email().is_some()
    }
}

/// Cart item count shown in the header badge. Recomputed from the
/// authoritative cart snapshot after every successful mutation.
#[derive(Default)]
pub struct CartBadge {
    count: AtomicU64,
}

impl CartBadge {
    #[must_use]
    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn set(&self, count: u64) {
        self.count.store(count, Ordering::Relaxed);
    }
}
