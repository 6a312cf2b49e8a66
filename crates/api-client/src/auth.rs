//! Authentication operations
//!
//! High-level login, registration, logout, and password reset flows built on
//! [`ApiClient`]. Successful login and registration install the returned
//! session into the credential store.

use crate::client::{ApiClient, SessionEvent};
use crate::error::{ApiError, Result};
use crate::http::ApiRequest;
use auth_store::{AuthStore, UserRecord};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<UserRecord>,
}

/// Result of a login or registration attempt
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    /// Whether a full session (token and user) was established
    pub authenticated: bool,

    /// The user returned by the backend, if any
    pub user: Option<UserRecord>,
}

/// Authentication flows over an [`ApiClient`]
pub struct AuthService {
    client: Arc<ApiClient>,
    store: Arc<AuthStore>,
}

impl AuthService {
    /// Create the service over a client and its credential store
    pub fn new(client: Arc<ApiClient>) -> Self {
        let store = client.store().clone();
        Self { client, store }
    }

    /// Log in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        require_field("email", email)?;
        require_field("password", password)?;

        let response: SessionResponse = self
            .client
            .post("/login", &serde_json::json!({ "email": email, "password": password }))
            .await?;

        self.install_session(response).await
    }

    /// Register a new account
    ///
    /// The backend establishes a session on successful registration, so this
    /// behaves like [`AuthService::login`] on success.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<LoginOutcome> {
        require_field("name", name)?;
        require_field("email", email)?;
        require_field("password", password)?;

        let response: SessionResponse = self
            .client
            .post(
                "/register",
                &serde_json::json!({ "name": name, "email": email, "password": password }),
            )
            .await?;

        self.install_session(response).await
    }

    /// Log in with an OAuth provider token
    pub async fn oauth_login(&self, provider: &str, token: &str) -> Result<LoginOutcome> {
        require_field("provider", provider)?;
        require_field("token", token)?;

        let response: SessionResponse = self
            .client
            .post(
                &format!("/oauth/{provider}"),
                &serde_json::json!({ "token": token }),
            )
            .await?;

        self.install_session(response).await
    }

    /// End the session
    ///
    /// Local credentials are cleared immediately so the session ends even
    /// when the server is unreachable; the server-side call runs afterwards
    /// on a best-effort basis, with the snapshotted token attached.
    pub async fn logout(&self) {
        let token = self.store.access_token().await;
        self.client.hard_logout().await;

        let request = ApiRequest::post("/logout").json_body(serde_json::json!({}));
        if let Err(err) = self
            .client
            .send::<serde_json::Value>(&request, token.as_deref())
            .await
        {
            warn!(%err, "server-side logout failed, local session already cleared");
        }
    }

    /// Request a password reset code for the given email
    pub async fn forgot_password(&self, email: &str) -> Result<serde_json::Value> {
        require_field("email", email)?;
        self.client
            .post("/forgot-password", &serde_json::json!({ "email": email }))
            .await
    }

    /// Check a password reset code before letting the user pick a new password
    pub async fn validate_reset_code(&self, email: &str, code: &str) -> Result<serde_json::Value> {
        require_field("email", email)?;
        require_field("code", code)?;
        self.client
            .post(
                "/reset-password/validate-code",
                &serde_json::json!({ "email": email, "code": code }),
            )
            .await
    }

    /// Set a new password using a validated reset code
    ///
    /// The confirmation is sent along so the backend can run the same
    /// match check the form does.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
        confirmed: &str,
    ) -> Result<serde_json::Value> {
        require_field("email", email)?;
        require_field("code", code)?;
        require_field("password", new_password)?;
        require_field("confirmed", confirmed)?;
        self.client
            .post(
                "/reset-password",
                &serde_json::json!({
                    "email": email,
                    "code": code,
                    "password": new_password,
                    "confirmed": confirmed,
                }),
            )
            .await
    }

    async fn install_session(&self, response: SessionResponse) -> Result<LoginOutcome> {
        let SessionResponse {
            access_token,
            refresh_token,
            user,
        } = response;

        if access_token.is_some() {
            self.store.set_access_token(access_token).await;
        }
        if refresh_token.is_some() {
            self.store.set_refresh_token(refresh_token).await;
        }
        if user.is_some() {
            self.store.set_user(user.clone()).await;
        }

        let authenticated = self.store.is_authenticated().await;
        if authenticated {
            info!("session established");
            self.client.notify(SessionEvent::Create);
        } else {
            warn!("authentication response was missing token or user");
        }

        Ok(LoginOutcome { authenticated, user })
    }
}

fn require_field(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{name} must not be empty")));
    }
    Ok(())
}
