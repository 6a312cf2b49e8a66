//! Request descriptions and client configuration

use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default bound on waiting for credential store rehydration
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`crate::ApiClient`]
///
/// # Example
///
/// ```
/// use api_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("https://api.example.com")
///     .with_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing slash
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// User agent header sent with every request
    pub user_agent: String,

    /// How long a request will wait for store rehydration before proceeding
    /// without credentials. `None` waits indefinitely.
    pub ready_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration for the given base URL with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("lumen/{}", env!("CARGO_PKG_VERSION")),
            ready_timeout: Some(DEFAULT_READY_TIMEOUT),
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Bound (or unbound, with `None`) the wait for store rehydration
    pub fn with_ready_timeout(mut self, ready_timeout: Option<Duration>) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }
}

/// HTTP methods used against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
}

/// A description of one request to the backend
///
/// Cheap to clone; the client clones it when a request has to be resubmitted
/// after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,

    /// Path relative to the base URL, starting with `/`
    pub path: String,

    /// JSON body, if any
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Describe a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    /// Describe a POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: None,
        }
    }

    /// Attach a JSON body
    pub fn json_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}
