//! Integration tests for credential attachment and the token refresh protocol

use api_client::{ApiClient, ApiError, AuthService, ClientConfig, SessionEvent};
use auth_store::{AuthStore, MemoryBackend, StorageBackend, UserRecord};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn loaded_store() -> Arc<AuthStore> {
    let store = Arc::new(AuthStore::new(Arc::new(MemoryBackend::new())));
    store.load().await;
    store
}

async fn session_store(access: &str, refresh: &str) -> Arc<AuthStore> {
    let store = loaded_store().await;
    store.set_access_token(Some(access.to_string())).await;
    store.set_refresh_token(Some(refresh.to_string())).await;
    store.set_user(Some(UserRecord::new("Alice"))).await;
    store
}

fn client_for(server: &MockServer, store: Arc<AuthStore>) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(ClientConfig::new(server.uri()), store).unwrap())
}

fn capture_events(client: &ApiClient) -> Arc<Mutex<Vec<SessionEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    client.set_session_callback(Arc::new(move |event| {
        sink.lock().unwrap().push(event);
    }));
    events
}

#[tokio::test]
async fn test_bearer_token_attached_to_requests() {
    let server = MockServer::start().await;
    let store = session_store("access-1", "refresh-1").await;
    let client = client_for(&server, store);

    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "Alice"})))
        .expect(1)
        .mount(&server)
        .await;

    let profile: serde_json::Value = client.get("/profile").await.unwrap();
    assert_eq!(profile["name"], "Alice");
}

#[tokio::test]
async fn test_request_without_session_has_no_auth_header() {
    let server = MockServer::start().await;
    let store = loaded_store().await;
    let client = client_for(&server, store);

    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let _: serde_json::Value = client.get("/public").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_requests_wait_for_store_rehydration() {
    let server = MockServer::start().await;
    let backend = Arc::new(MemoryBackend::new());
    backend
        .set(
            auth_store::AUTH_STORAGE_KEY,
            r#"{"accessToken":"persisted-token","refreshToken":"persisted-refresh","user":{"name":"Alice"}}"#,
        )
        .await
        .unwrap();
    let store = Arc::new(AuthStore::new(backend));
    let client = client_for(&server, store.clone());

    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("authorization", "Bearer persisted-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "Alice"})))
        .expect(1)
        .mount(&server)
        .await;

    // Rehydration finishes only after the request has started
    let loader = {
        let store = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            store.load().await;
        })
    };

    let _: serde_json::Value = client.get("/profile").await.unwrap();
    loader.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_expired_requests_trigger_one_refresh() {
    let server = MockServer::start().await;
    let store = session_store("stale-token", "refresh-1").await;
    let client = client_for(&server, store.clone());
    let events = capture_events(&client);

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "expired"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(serde_json::json!({"refresh_token": "refresh-1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(
                    serde_json::json!({"access_token": "fresh-token", "refresh_token": "refresh-2"}),
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .expect(2)
        .mount(&server)
        .await;

    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.get::<serde_json::Value>("/items").await })
    };
    let second = {
        let client = client.clone();
        tokio::spawn(async move { client.get::<serde_json::Value>("/items").await })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(store.access_token().await, Some("fresh-token".to_string()));
    assert_eq!(store.refresh_token().await, Some("refresh-2".to_string()));
    assert_eq!(events.lock().unwrap().as_slice(), &[SessionEvent::Update]);
}

#[tokio::test]
async fn test_second_unauthorized_response_propagates() {
    let server = MockServer::start().await;
    let store = session_store("stale-token", "refresh-1").await;
    let client = client_for(&server, store.clone());

    // The endpoint rejects even the refreshed token
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "still expired"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "fresh-token"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client.get::<serde_json::Value>("/items").await.unwrap_err();
    assert!(matches!(err, ApiError::AuthExpired(_)));

    // The refresh itself succeeded, so the session is still intact
    assert_eq!(store.access_token().await, Some("fresh-token".to_string()));
}

#[tokio::test]
async fn test_refresh_failure_rejects_all_waiters_and_ends_session() {
    let server = MockServer::start().await;
    let store = session_store("stale-token", "refresh-1").await;
    let client = client_for(&server, store.clone());
    let events = capture_events(&client);

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "expired"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_delay(Duration::from_millis(200))
                .set_body_json(serde_json::json!({"message": "refresh token revoked"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.get::<serde_json::Value>("/items").await })
    };
    let second = {
        let client = client.clone();
        tokio::spawn(async move { client.get::<serde_json::Value>("/items").await })
    };

    let first = first.await.unwrap().unwrap_err();
    let second = second.await.unwrap().unwrap_err();
    assert!(matches!(first, ApiError::RefreshFailed(_)));
    assert!(matches!(second, ApiError::RefreshFailed(_)));

    assert!(!store.is_authenticated().await);
    assert!(store.refresh_token().await.is_none());
    assert_eq!(events.lock().unwrap().as_slice(), &[SessionEvent::Expired]);
}

#[tokio::test]
async fn test_missing_refresh_token_fails_without_a_refresh_call() {
    let server = MockServer::start().await;
    let store = loaded_store().await;
    store.set_access_token(Some("stale-token".to_string())).await;
    store.set_user(Some(UserRecord::new("Alice"))).await;
    let client = client_for(&server, store.clone());

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "expired"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.get::<serde_json::Value>("/items").await.unwrap_err();
    assert!(matches!(err, ApiError::RefreshFailed(_)));
    assert!(!store.is_authenticated().await);
}

#[tokio::test]
async fn test_forbidden_response_ends_session_without_retry() {
    let server = MockServer::start().await;
    let store = session_store("access-1", "refresh-1").await;
    let client = client_for(&server, store.clone());
    let events = capture_events(&client);

    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(serde_json::json!({"message": "not yours"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client.get::<serde_json::Value>("/admin").await.unwrap_err();
    assert!(matches!(err, ApiError::AuthForbidden(_)));

    assert!(!store.is_authenticated().await);
    assert!(store.refresh_token().await.is_none());
    assert_eq!(events.lock().unwrap().as_slice(), &[SessionEvent::Expired]);
}

#[tokio::test]
async fn test_request_timeout_surfaces_as_transport_error() {
    let server = MockServer::start().await;
    let store = session_store("access-1", "refresh-1").await;
    let client = Arc::new(
        ApiClient::new(
            ClientConfig::new(server.uri()).with_timeout(Duration::from_millis(100)),
            store,
        )
        .unwrap(),
    );

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let err = client.get::<serde_json::Value>("/slow").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn test_server_error_carries_status_and_message() {
    let server = MockServer::start().await;
    let store = loaded_store().await;
    let client = client_for(&server, store);

    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(serde_json::json!({"message": "email already taken"})),
        )
        .mount(&server)
        .await;

    let err = client
        .post::<serde_json::Value, _>(
            "/register",
            &serde_json::json!({"name": "Alice", "email": "a@b.c", "password": "secret"}),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ApiError::Server {
            status: 422,
            message: "email already taken".to_string(),
        }
    );
}

#[tokio::test]
async fn test_login_installs_session_and_fires_create() {
    let server = MockServer::start().await;
    let store = loaded_store().await;
    let client = client_for(&server, store.clone());
    let events = capture_events(&client);
    let auth = AuthService::new(client);

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(serde_json::json!({"email": "a@b.c", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "user": {"name": "Alice", "email": "a@b.c"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = auth.login("a@b.c", "secret").await.unwrap();
    assert!(outcome.authenticated);
    assert_eq!(outcome.user.map(|u| u.name), Some("Alice".to_string()));

    assert!(store.is_authenticated().await);
    assert_eq!(store.access_token().await, Some("access-1".to_string()));
    assert_eq!(store.refresh_token().await, Some("refresh-1".to_string()));
    assert_eq!(events.lock().unwrap().as_slice(), &[SessionEvent::Create]);
}

#[tokio::test]
async fn test_login_failure_leaves_store_untouched() {
    let server = MockServer::start().await;
    let store = loaded_store().await;
    let client = client_for(&server, store.clone());
    let auth = AuthService::new(client);

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(serde_json::json!({"message": "wrong password"})),
        )
        .mount(&server)
        .await;

    let err = auth.login("a@b.c", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(!store.is_authenticated().await);
}

#[tokio::test]
async fn test_logout_clears_session_even_when_server_call_fails() {
    let server = MockServer::start().await;
    let store = session_store("access-1", "refresh-1").await;
    let client = client_for(&server, store.clone());
    let events = capture_events(&client);
    let auth = AuthService::new(client);

    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    auth.logout().await;

    assert!(!store.is_authenticated().await);
    assert!(store.access_token().await.is_none());
    assert_eq!(events.lock().unwrap().as_slice(), &[SessionEvent::Expired]);
}

#[tokio::test]
async fn test_logout_request_carries_token_snapshotted_before_clearing() {
    let server = MockServer::start().await;
    let store = session_store("access-1", "refresh-1").await;
    let client = client_for(&server, store.clone());
    let auth = AuthService::new(client);

    // The store is cleared before the server call, so the bearer header can
    // only come from a snapshot taken up front
    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    auth.logout().await;

    assert!(!store.is_authenticated().await);
    assert!(store.access_token().await.is_none());
}

#[tokio::test]
async fn test_password_reset_flow_endpoints() {
    let server = MockServer::start().await;
    let store = loaded_store().await;
    let client = client_for(&server, store);
    let auth = AuthService::new(client);

    Mock::given(method("POST"))
        .and(path("/forgot-password"))
        .and(body_json(serde_json::json!({"email": "a@b.c"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sent": true})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/reset-password/validate-code"))
        .and(body_json(serde_json::json!({"email": "a@b.c", "code": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"valid": true})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/reset-password"))
        .and(body_json(serde_json::json!({
            "email": "a@b.c",
            "code": "123456",
            "password": "new-secret",
            "confirmed": "new-secret",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"reset": true})))
        .expect(1)
        .mount(&server)
        .await;

    let sent = auth.forgot_password("a@b.c").await.unwrap();
    assert_eq!(sent["sent"], true);

    let valid = auth.validate_reset_code("a@b.c", "123456").await.unwrap();
    assert_eq!(valid["valid"], true);

    let reset = auth
        .reset_password("a@b.c", "123456", "new-secret", "new-secret")
        .await
        .unwrap();
    assert_eq!(reset["reset"], true);
}
