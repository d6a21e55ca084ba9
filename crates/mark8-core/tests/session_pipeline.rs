//! End-to-end behaviour of the authenticated request pipeline against a
//! mock API server.

use std::sync::Arc;

use mark8_core::api::{ApiClient, ApiError};
use mark8_core::auth::{
    CookieJar, CredentialStore, LoginRequest, RefreshState, SessionFile, TokenSink,
};
use mockito::{Matcher, Server, ServerGuard};

const PRODUCT_BODY: &str = r#"{"status":200,"message":"Product fetched","data":{"id":"p-1","name":"Imigongo Print","unitPrice":42000}}"#;
const REFRESH_PATH: &str = "/auth/get-new-access-token";

fn refresh_body(access: &str, refresh: &str) -> String {
    format!(
        r#"{{"status":200,"message":"Token refreshed","data":{{"accessToken":"{}","refreshToken":"{}"}}}}"#,
        access, refresh
    )
}

fn client_with_tokens(server: &ServerGuard, tokens: Option<(&str, &str)>) -> ApiClient {
    let store = Arc::new(CredentialStore::in_memory());
    if let Some((access, refresh)) = tokens {
        store.set_tokens(access, refresh).unwrap();
    }
    ApiClient::new(&server.url(), store).unwrap()
}

#[tokio::test]
async fn valid_token_needs_no_refresh() {
    let mut server = Server::new_async().await;
    let product = server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PRODUCT_BODY)
        .expect(1)
        .create_async()
        .await;
    let refresh = server.mock("GET", REFRESH_PATH).expect(0).create_async().await;

    let api = client_with_tokens(&server, Some(("A1", "R1")));
    let fetched = api.fetch_product("p-1").await.unwrap();

    assert_eq!(fetched.name, "Imigongo Print");
    assert_eq!(fetched.unit_price, 42000.0);
    product.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn anonymous_request_has_no_authorization_header() {
    let mut server = Server::new_async().await;
    let product = server
        .mock("GET", "/products/p-1")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(PRODUCT_BODY)
        .expect(1)
        .create_async()
        .await;

    let api = client_with_tokens(&server, None);
    api.fetch_product("p-1").await.unwrap();
    product.assert_async().await;
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_retried_once() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("GET", REFRESH_PATH)
        .match_header("refresh-token", "R1")
        .with_status(200)
        .with_body(refresh_body("A2", "R2"))
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body(PRODUCT_BODY)
        .expect(1)
        .create_async()
        .await;

    let api = client_with_tokens(&server, Some(("A1", "R1")));
    let fetched = api.fetch_product("p-1").await.unwrap();
    assert_eq!(fetched.id, "p-1");

    let store = api.credentials();
    assert_eq!(store.access_token().as_deref(), Some("A2"));
    assert_eq!(store.refresh_token().as_deref(), Some("R2"));
    assert_eq!(api.pipeline().refresher().state(), RefreshState::Idle);

    rejected.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
}

#[tokio::test]
async fn invalid_refresh_token_clears_session_and_returns_original_failure() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("GET", REFRESH_PATH)
        .match_header("refresh-token", "R1")
        .with_status(401)
        .with_body(r#"{"status":401,"message":"Invalid refresh token"}"#)
        .expect(1)
        .create_async()
        .await;

    let api = client_with_tokens(&server, Some(("A1", "R1")));
    let mut changes = api.credentials().subscribe();

    let err = api.fetch_product("p-1").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(api.credentials().snapshot().is_empty());
    assert!(changes.has_changed().unwrap());
    assert!(changes.borrow_and_update().is_empty());

    rejected.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn second_rejection_is_not_refreshed_again() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("GET", REFRESH_PATH)
        .with_status(200)
        .with_body(refresh_body("A2", "R2"))
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A2")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let api = client_with_tokens(&server, Some(("A1", "R1")));
    let err = api.fetch_product("p-1").await.unwrap_err();

    assert!(err.is_unauthorized());
    // The refresh itself succeeded, so the renewed pair stays
    assert_eq!(api.credentials().access_token().as_deref(), Some("A2"));
    refresh.assert_async().await;
    retried.assert_async().await;
}

#[tokio::test]
async fn missing_refresh_token_makes_no_refresh_call() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/products/p-1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server.mock("GET", REFRESH_PATH).expect(0).create_async().await;

    let api = client_with_tokens(&server, None);
    let err = api.fetch_product("p-1").await.unwrap_err();

    assert!(err.is_unauthorized());
    refresh.assert_async().await;
}

#[tokio::test]
async fn other_failures_pass_through_untouched() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/products/broken")
        .with_status(503)
        .with_body(r#"{"status":503,"message":"Maintenance"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/store/missing")
        .with_status(404)
        .with_body(r#"{"status":404,"message":"Store not found"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/products/garbled")
        .with_status(200)
        .with_body("<html>")
        .create_async()
        .await;
    let refresh = server.mock("GET", REFRESH_PATH).expect(0).create_async().await;

    let api = client_with_tokens(&server, Some(("A1", "R1")));

    let err = api.fetch_product("broken").await.unwrap_err();
    assert!(matches!(err, ApiError::ServerError(ref m) if m == "Maintenance"));

    let err = api.fetch_store("missing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(ref m) if m == "Store not found"));

    let err = api.fetch_product("garbled").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));

    assert_eq!(api.credentials().access_token().as_deref(), Some("A1"));
    refresh.assert_async().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_rejections_share_one_refresh() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect_at_least(1)
        .create_async()
        .await;
    let refresh = server
        .mock("GET", REFRESH_PATH)
        .match_header("refresh-token", "R1")
        .with_status(200)
        .with_body(refresh_body("A2", "R2"))
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body(PRODUCT_BODY)
        .expect(4)
        .create_async()
        .await;

    let api = client_with_tokens(&server, Some(("A1", "R1")));
    let calls = (0..4).map(|_| {
        let api = api.clone();
        async move { api.fetch_product("p-1").await }
    });
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(api.credentials().refresh_token().as_deref(), Some("R2"));
    refresh.assert_async().await;
    retried.assert_async().await;
}

#[tokio::test]
async fn token_override_applies_to_first_attempt_only() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer SERVER-SIDE")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("GET", REFRESH_PATH)
        .match_header("refresh-token", "R1")
        .with_status(200)
        .with_body(refresh_body("A2", "R2"))
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body(PRODUCT_BODY)
        .expect(1)
        .create_async()
        .await;

    let api = client_with_tokens(&server, Some(("A1", "R1")));
    api.with_token("SERVER-SIDE").fetch_product("p-1").await.unwrap();

    assert_eq!(api.credentials().access_token().as_deref(), Some("A2"));
    refresh.assert_async().await;
    retried.assert_async().await;
}

async fn refresh_with_unusable_body_ends_session(body: &str) {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("GET", REFRESH_PATH)
        .with_status(200)
        .with_body(body)
        .expect(1)
        .create_async()
        .await;

    let api = client_with_tokens(&server, Some(("A1", "R1")));
    let err = api.fetch_product("p-1").await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
    assert!(api.credentials().snapshot().is_empty());
    rejected.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn refresh_response_without_tokens_clears_session() {
    refresh_with_unusable_body_ends_session(r#"{"status":200,"message":"ok","data":{}}"#).await;
}

#[tokio::test]
async fn refresh_response_with_empty_access_token_clears_session() {
    refresh_with_unusable_body_ends_session(&refresh_body("", "R2")).await;
}

#[tokio::test]
async fn refreshed_tokens_reach_both_sinks() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("GET", REFRESH_PATH)
        .with_status(200)
        .with_body(refresh_body("A2", "R2"))
        .create_async()
        .await;
    server
        .mock("GET", "/products/p-1")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body(PRODUCT_BODY)
        .create_async()
        .await;

    let sinks: Vec<Box<dyn TokenSink>> = vec![
        Box::new(SessionFile::new(dir.path())),
        Box::new(CookieJar::new(dir.path())),
    ];
    let store = Arc::new(CredentialStore::open(sinks));
    store.set_tokens("A1", "R1").unwrap();
    let api = ApiClient::new(&server.url(), Arc::clone(&store)).unwrap();

    api.fetch_product("p-1").await.unwrap();

    let snapshot = SessionFile::new(dir.path()).load().unwrap().unwrap();
    assert_eq!(snapshot.access_token(), Some("A2"));
    let cookies = CookieJar::new(dir.path()).tokens().unwrap();
    assert_eq!(cookies.access_token.as_deref(), Some("A2"));
    assert_eq!(cookies.refresh_token.as_deref(), Some("R2"));
}

#[tokio::test]
async fn login_installs_session() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/auth/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(serde_json::json!({
            "email": "jane@example.com",
            "password": "hunter222"
        })))
        .with_status(200)
        .with_body(r#"{"status":200,"message":"Logged in","data":{"accessToken":"A1","refreshToken":"R1","id":"u-1","email":"jane@example.com","firstName":"Jane","lastName":"Doe"}}"#)
        .expect(1)
        .create_async()
        .await;

    let api = client_with_tokens(&server, None);
    let user = api
        .login(&LoginRequest::new("jane@example.com", "hunter222"))
        .await
        .unwrap();

    assert_eq!(user.full_name(), "Jane Doe");
    let credentials = api.credentials().snapshot();
    assert_eq!(credentials.access_token(), Some("A1"));
    assert_eq!(credentials.user().map(|u| u.id.as_str()), Some("u-1"));
    login.assert_async().await;
}

#[tokio::test]
async fn rejected_login_does_not_refresh_or_touch_session() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(401)
        .with_body(r#"{"status":401,"message":"Invalid credentials"}"#)
        .create_async()
        .await;
    let refresh = server.mock("GET", REFRESH_PATH).expect(0).create_async().await;

    let api = client_with_tokens(&server, None);
    let err = api
        .login(&LoginRequest::new("jane@example.com", "wrong-password"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(api.credentials().snapshot().is_empty());
    refresh.assert_async().await;
}

#[tokio::test]
async fn invalid_login_form_is_not_sent() {
    let mut server = Server::new_async().await;
    let login = server.mock("POST", "/auth/login").expect(0).create_async().await;

    let api = client_with_tokens(&server, None);
    let err = api
        .login(&LoginRequest::new("not-an-email", "short"))
        .await
        .unwrap_err();

    match err {
        ApiError::Validation(fields) => assert_eq!(fields.len(), 2),
        other => panic!("expected validation error, got {:?}", other),
    }
    login.assert_async().await;
}
