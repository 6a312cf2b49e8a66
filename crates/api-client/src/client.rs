//! The authenticated HTTP client
//!
//! Every request flows through [`ApiClient::execute`], which attaches the
//! current bearer token, retries once after a coordinated token refresh on
//! 401, and tears the session down on 403 or refresh failure.

use crate::error::{ApiError, Result};
use crate::http::{ApiRequest, ClientConfig, HttpMethod};
use auth_store::AuthStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Session lifecycle events emitted by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was established (login or register)
    Create,
    /// The session tokens were rotated by a successful refresh
    Update,
    /// The session ended: hard logout after 403 or refresh failure
    Expired,
}

/// Callback invoked on session lifecycle events
pub type SessionCallback = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Refresh coordination state
///
/// `refreshing` is true while one request (the leader) runs the refresh
/// call; every other expired request parks a waiter here instead of issuing
/// its own refresh. Both fields are only touched under the mutex, and the
/// mutex is never held across an await point.
#[derive(Default)]
struct RefreshGate {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<Result<String>>>,
}

enum RefreshRole {
    Leader,
    Follower(oneshot::Receiver<Result<String>>),
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// HTTP client bound to a credential store
///
/// Cheap to share as `Arc<ApiClient>`; all interior state is synchronized.
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<AuthStore>,
    gate: Mutex<RefreshGate>,
    callback: RwLock<Option<SessionCallback>>,
}

impl ApiClient {
    /// Create a client over the given configuration and credential store
    pub fn new(config: ClientConfig, store: Arc<AuthStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            store,
            gate: Mutex::new(RefreshGate::default()),
            callback: RwLock::new(None),
        })
    }

    /// Register a callback for session lifecycle events
    ///
    /// Replaces any previously registered callback.
    pub fn set_session_callback(&self, callback: SessionCallback) {
        let mut slot = self
            .callback
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(callback);
    }

    /// The credential store this client reads tokens from
    pub fn store(&self) -> &Arc<AuthStore> {
        &self.store
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        let slot = self
            .callback
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(callback) = slot.as_ref() {
            callback(event);
        }
    }

    /// Issue a GET request and decode the JSON response
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(&ApiRequest::get(path)).await
    }

    /// Issue a POST request with a JSON body and decode the JSON response
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Transport(format!("failed to encode request body: {e}")))?;
        self.execute(&ApiRequest::post(path).json_body(body)).await
    }

    /// Execute a request with credential attachment and the retry protocol
    ///
    /// On 401 the request joins the coordinated refresh and is resubmitted
    /// once with the new token; a second 401 propagates as-is. On 403 the
    /// session is torn down and the error propagates without a retry.
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let mut token = self.current_token().await;
        let mut retried = false;

        loop {
            match self.send(request, token.as_deref()).await {
                Err(ApiError::AuthExpired(_)) if !retried => {
                    retried = true;
                    token = Some(self.token_after_refresh().await?);
                }
                Err(ApiError::AuthForbidden(message)) => {
                    info!(path = %request.path, "request forbidden, ending session");
                    self.hard_logout().await;
                    return Err(ApiError::AuthForbidden(message));
                }
                other => return other,
            }
        }
    }

    /// Read the current access token, waiting for store rehydration first
    ///
    /// If rehydration does not finish within the configured bound the
    /// request proceeds without credentials rather than hanging.
    async fn current_token(&self) -> Option<String> {
        match self.config.ready_timeout {
            Some(limit) => {
                if self.store.await_ready_timeout(limit).await.is_err() {
                    warn!("credential store not ready in time, proceeding without token");
                }
            }
            None => self.store.await_ready().await,
        }
        self.store.access_token().await
    }

    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<T> {
        let url = format!("{}{}", self.config.base_url, request.path);

        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
        };
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = extract_error_message(&text, status);
            debug!(%status, path = %request.path, "request failed");
            return Err(ApiError::from_status(status.as_u16(), message));
        }

        // Endpoints with empty bodies decode as JSON null
        let payload = if text.is_empty() { "null" } else { &text };
        serde_json::from_str(payload)
            .map_err(|e| ApiError::Transport(format!("failed to decode response body: {e}")))
    }

    // ========================================================================
    // Refresh coordination
    // ========================================================================

    /// Join the coordinated refresh and return the new access token
    ///
    /// The first expired request becomes the leader and runs the refresh
    /// call; everyone else parks on a oneshot and receives the leader's
    /// outcome, success and failure alike.
    async fn token_after_refresh(&self) -> Result<String> {
        let role = {
            let mut gate = self
                .gate
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if gate.refreshing {
                let (tx, rx) = oneshot::channel();
                gate.waiters.push(tx);
                RefreshRole::Follower(rx)
            } else {
                gate.refreshing = true;
                RefreshRole::Leader
            }
        };

        match role {
            RefreshRole::Follower(rx) => {
                debug!("waiting on in-flight token refresh");
                rx.await
                    .map_err(|_| ApiError::RefreshFailed("refresh abandoned before completion".into()))?
            }
            RefreshRole::Leader => {
                let outcome = self.run_refresh().await;

                let waiters = {
                    let mut gate = self
                        .gate
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    gate.refreshing = false;
                    std::mem::take(&mut gate.waiters)
                };

                match &outcome {
                    Ok(token) => {
                        info!(waiters = waiters.len(), "token refresh succeeded");
                        for waiter in waiters {
                            let _ = waiter.send(Ok(token.clone()));
                        }
                        self.notify(SessionEvent::Update);
                    }
                    Err(err) => {
                        warn!(%err, waiters = waiters.len(), "token refresh failed, ending session");
                        for waiter in waiters {
                            let _ = waiter.send(Err(err.clone()));
                        }
                        self.hard_logout().await;
                    }
                }

                outcome
            }
        }
    }

    /// Perform the actual refresh call and update the store
    async fn run_refresh(&self) -> Result<String> {
        let refresh_token = self
            .store
            .refresh_token()
            .await
            .ok_or_else(|| ApiError::RefreshFailed("no refresh token available".into()))?;

        let request = ApiRequest::post("/auth/refresh")
            .json_body(serde_json::json!({ "refresh_token": refresh_token }));
        let token = self.store.access_token().await;

        let response: RefreshResponse = self
            .send(&request, token.as_deref())
            .await
            .map_err(|e| ApiError::RefreshFailed(e.to_string()))?;

        self.store
            .set_access_token(Some(response.access_token.clone()))
            .await;
        if let Some(rotated) = response.refresh_token {
            self.store.set_refresh_token(Some(rotated)).await;
        }

        Ok(response.access_token)
    }

    /// Clear the session and announce its end
    pub(crate) async fn hard_logout(&self) {
        self.store.logout().await;
        self.notify(SessionEvent::Expired);
    }
}

fn extract_error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.or(parsed.error) {
            return message;
        }
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}
