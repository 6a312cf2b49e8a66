//! Lumen application wiring
//!
//! Assembles the credential store, the API client, the auth service, and the
//! navigator into one [`App`], with session events driving navigation: a new
//! session lands on home, an expired session lands back on login.

#![warn(missing_docs)]
#![warn(clippy::all)]

use anyhow::Result;
use api_client::{ApiClient, AuthService, ClientConfig, SessionEvent};
use app_ui::{Navigator, Route};
use auth_store::AuthStore;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the backend
    pub api_url: String,

    /// Directory for persisted app data
    pub data_dir: PathBuf,

    /// Per-request timeout override, when set
    pub request_timeout: Option<Duration>,
}

impl AppConfig {
    /// Create a configuration with default timeouts
    pub fn new(api_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_url: api_url.into(),
            data_dir: data_dir.into(),
            request_timeout: None,
        }
    }

    /// Override the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// The assembled application
pub struct App {
    store: Arc<AuthStore>,
    client: Arc<ApiClient>,
    auth: AuthService,
    navigator: Arc<Mutex<Navigator>>,
}

impl App {
    /// The credential store
    pub fn store(&self) -> &Arc<AuthStore> {
        &self.store
    }

    /// The API client
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// The authentication service
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// The navigator, shared with the session callback
    pub fn navigator(&self) -> &Arc<Mutex<Navigator>> {
        &self.navigator
    }

    /// The screen currently on top of the navigation stack
    pub fn current_route(&self) -> Route {
        *self
            .navigator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .current()
    }
}

/// Build the application: rehydrate credentials, wire the client to the
/// store, and point session events at the navigator
pub async fn bootstrap(config: AppConfig) -> Result<App> {
    let store = Arc::new(AuthStore::with_fallback(config.data_dir.clone()));
    store.load().await;

    let mut client_config = ClientConfig::new(config.api_url.clone());
    if let Some(timeout) = config.request_timeout {
        client_config = client_config.with_timeout(timeout);
    }
    let client = Arc::new(ApiClient::new(client_config, store.clone())?);

    // Land on home when a session was rehydrated, otherwise on login
    let authenticated = store.is_authenticated().await;
    let mut navigator = Navigator::new(Route::Login);
    navigator.set_authenticated(authenticated);
    if authenticated {
        navigator.reset_to(Route::Home);
    }
    let navigator = Arc::new(Mutex::new(navigator));

    let nav = navigator.clone();
    client.set_session_callback(Arc::new(move |event| {
        let mut nav = nav.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match event {
            SessionEvent::Create => {
                nav.set_authenticated(true);
                nav.reset_to(Route::Home);
            }
            SessionEvent::Expired => {
                nav.set_authenticated(false);
                nav.reset_to(Route::Login);
            }
            SessionEvent::Update => {}
        }
    }));

    let auth = AuthService::new(client.clone());

    info!(api_url = %config.api_url, authenticated, "application bootstrapped");

    Ok(App {
        store,
        client,
        auth,
        navigator,
    })
}

/// Initialize tracing with an env-filter, defaulting to `info`
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
