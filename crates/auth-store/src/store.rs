//! The credential store
//!
//! Holds the current access token, refresh token, and authenticated user.
//! Every mutation persists the credential subset to the configured backend,
//! and a readiness gate lets callers wait for rehydration to finish before
//! the first credential read after process start.

use crate::backend::{FileBackend, MemoryBackend, StorageBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

/// Storage key for the persisted credential record
pub const AUTH_STORAGE_KEY: &str = "auth-storage";

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend error
    #[error("Backend error: {0}")]
    Backend(#[from] crate::backend::BackendError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rehydration did not complete within the allowed wait
    #[error("Timed out waiting for store rehydration")]
    ReadyTimeout,
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Authenticated user identity
///
/// Opaque to the client core beyond the display name; any extra fields the
/// backend sends are preserved through persistence round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Display name
    pub name: String,

    /// Email address, when the backend provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Backend-specific fields carried along unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserRecord {
    /// Create a user record with just a display name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Persisted subset of the store: exactly the three identity fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserRecord>,
}

#[derive(Debug, Default)]
struct AuthState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<UserRecord>,
}

impl AuthState {
    fn snapshot(&self) -> PersistedCredentials {
        PersistedCredentials {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            user: self.user.clone(),
        }
    }
}

/// The credential store
///
/// One instance per process, shared as `Arc<AuthStore>` with every component
/// that issues authenticated requests. `is_authenticated` is always derived
/// from the presence of both token and user rather than stored, so it can
/// never desync from the underlying fields.
pub struct AuthStore {
    state: RwLock<AuthState>,
    backend: Arc<dyn StorageBackend>,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
}

impl AuthStore {
    /// Create a store over the given persistence backend
    ///
    /// The store starts empty and not ready; call [`AuthStore::load`] to
    /// rehydrate persisted credentials and mark the store ready.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        let (ready_tx, ready_rx) = watch::channel(false);
        Self {
            state: RwLock::new(AuthState::default()),
            backend,
            ready_tx,
            ready_rx,
        }
    }

    /// Create a store backed by durable file storage under `dir`, falling
    /// back to volatile in-memory storage if the directory cannot be opened
    ///
    /// The fallback is deliberate behavior, not an error: the session simply
    /// will not survive a process restart.
    pub fn with_fallback(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        match FileBackend::new(dir.clone()) {
            Ok(backend) => Self::new(Arc::new(backend)),
            Err(err) => {
                warn!(%err, path = %dir.display(), "durable storage unavailable, using in-memory credentials");
                Self::new(Arc::new(MemoryBackend::new()))
            }
        }
    }

    /// Rehydrate persisted credentials and mark the store ready
    ///
    /// Absence or corruption of the persisted record means "no session":
    /// the store comes up cleared rather than failing.
    pub async fn load(&self) {
        let loaded = match self.backend.get(AUTH_STORAGE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedCredentials>(&raw) {
                Ok(credentials) => credentials,
                Err(err) => {
                    warn!(%err, "persisted credentials are corrupt, starting with no session");
                    PersistedCredentials::default()
                }
            },
            Ok(None) => PersistedCredentials::default(),
            Err(err) => {
                warn!(%err, "failed to read persisted credentials, starting with no session");
                PersistedCredentials::default()
            }
        };

        {
            let mut state = self.state.write().await;
            state.access_token = loaded.access_token;
            state.refresh_token = loaded.refresh_token;
            state.user = loaded.user;
            debug!(has_session = state.access_token.is_some(), "credential store rehydrated");
        }

        self.ready_tx.send_replace(true);
    }

    /// Whether rehydration has completed
    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Suspend until rehydration has completed
    pub async fn await_ready(&self) {
        let mut rx = self.ready_rx.clone();
        // The sender lives on self, so changed() cannot fail while we hold &self
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Suspend until rehydration has completed, up to `limit`
    pub async fn await_ready_timeout(&self, limit: Duration) -> Result<()> {
        tokio::time::timeout(limit, self.await_ready())
            .await
            .map_err(|_| StoreError::ReadyTimeout)
    }

    /// Current access token, if any
    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    /// Current refresh token, if any
    pub async fn refresh_token(&self) -> Option<String> {
        self.state.read().await.refresh_token.clone()
    }

    /// Current authenticated user, if any
    pub async fn user(&self) -> Option<UserRecord> {
        self.state.read().await.user.clone()
    }

    /// Whether a session is established: access token present AND user present
    pub async fn is_authenticated(&self) -> bool {
        let state = self.state.read().await;
        state.access_token.is_some() && state.user.is_some()
    }

    /// Replace the access token and persist
    pub async fn set_access_token(&self, token: Option<String>) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.access_token = token;
            state.snapshot()
        };
        self.persist(snapshot).await;
    }

    /// Replace the refresh token and persist
    pub async fn set_refresh_token(&self, token: Option<String>) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.refresh_token = token;
            state.snapshot()
        };
        self.persist(snapshot).await;
    }

    /// Replace the authenticated user and persist
    pub async fn set_user(&self, user: Option<UserRecord>) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.user = user;
            state.snapshot()
        };
        self.persist(snapshot).await;
    }

    /// Clear all identity fields atomically and persist the cleared record
    ///
    /// Persisting the cleared state ensures a relaunch does not resurrect
    /// stale credentials. Idempotent.
    pub async fn logout(&self) {
        let snapshot = {
            let mut state = self.state.write().await;
            state.access_token = None;
            state.refresh_token = None;
            state.user = None;
            state.snapshot()
        };
        info!("credentials cleared");
        self.persist(snapshot).await;
    }

    /// Best-effort persistence of the credential subset
    async fn persist(&self, snapshot: PersistedCredentials) {
        let raw = match serde_json::to_string(&snapshot) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "failed to serialize credentials, skipping persistence");
                return;
            }
        };

        if let Err(err) = self.backend.set(AUTH_STORAGE_KEY, &raw).await {
            warn!(%err, "failed to persist credentials");
        }
    }
}
