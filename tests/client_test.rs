//! API client tests
//!
//! Auth header injection, response normalization, the 401 refresh-and-retry
//! cycle and transport failures, against a mockito server.

use async_trait::async_trait;
use cinemate::api::{ApiClient, ApiRequest, ClientOptions, SessionExpiryHandler, REFRESH_ENDPOINT};
use cinemate::models::{codes, FormErrors};
use cinemate::storage::{KeyValueStore, MemoryStore, TOKEN_KEY};
use mockito::{Matcher, Server};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Fixtures
// =============================================================================

const FAVOURITES_BODY: &str = r#"{
    "success": true,
    "message": "Favourites fetched",
    "data": [
        {"id": 603, "title": "The Matrix", "release_date": "1999-03-31", "vote_average": 8.2},
        {"id": 78, "title": "Blade Runner", "release_date": "1982-06-25", "vote_average": 7.9}
    ]
}"#;

const UNAUTHORIZED_BODY: &str = r#"{
    "success": false,
    "message": "Token expired",
    "error": {"code": "TOKEN_EXPIRED"}
}"#;

#[derive(Default)]
struct CountingExpiry {
    calls: AtomicUsize,
}

#[async_trait]
impl SessionExpiryHandler for CountingExpiry {
    async fn session_expired(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

async fn store_with_token(token: Option<&str>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    if let Some(token) = token {
        store.set_item(TOKEN_KEY, token).await.unwrap();
    }
    store
}

// =============================================================================
// Headers
// =============================================================================

#[tokio::test]
async fn test_stored_token_sent_as_bearer() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/movies/favourites")
        .match_header("authorization", "Bearer T1")
        .match_header("x-platform", "mobile")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(FAVOURITES_BODY)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(Some("T1")).await);
    let res = client.favourites().await.unwrap();

    mock.assert_async().await;
    assert_eq!(res.message, "Favourites fetched");
    assert_eq!(res.data.len(), 2);
    assert_eq!(res.data[1].title, "Blade Runner");
    assert_eq!(res.data[1].year(), Some(1982));
}

#[tokio::test]
async fn test_no_token_omits_authorization() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/system/health")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"success": true, "data": {"status": "ok", "version": "1.4.0"}}"#)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(None).await);
    let res = client.health().await.unwrap();

    mock.assert_async().await;
    assert_eq!(res.data.status, "ok");
    assert_eq!(res.data.version.as_deref(), Some("1.4.0"));
}

#[tokio::test]
async fn test_search_sends_query_params() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/movies/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), "blade runner".into()),
            Matcher::UrlEncoded("year".into(), "1982".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"data": {"results": [{"id": 78, "title": "Blade Runner"}], "page": 1, "total_pages": 1, "total_results": 1}}"#)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(None).await);
    let query = cinemate::api::SearchQuery {
        year: Some(1982),
        ..cinemate::api::SearchQuery::new("blade runner")
    };
    let res = client.search(&query).await.unwrap();

    mock.assert_async().await;
    assert_eq!(res.data.results.len(), 1);
    assert_eq!(res.data.results[0].id, 78);
}

#[tokio::test]
async fn test_details_puts_id_in_path() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/movies/details/603")
        .with_status(200)
        .with_body(r#"{"data": {"id": 603, "title": "The Matrix", "runtime": 136, "is_favourite": true}}"#)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(Some("T1")).await);
    let res = client.details(603).await.unwrap();

    mock.assert_async().await;
    assert_eq!(res.data.title, "The Matrix");
    assert_eq!(res.data.runtime, Some(136));
    assert!(res.data.is_favourite);
}

// =============================================================================
// Normalization
// =============================================================================

#[tokio::test]
async fn test_success_without_flag_or_data_defaults() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/movies/favourites")
        .match_body(Matcher::Json(json!({"movie_id": 603})))
        .with_status(201)
        .with_body(r#"{}"#)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(Some("T1")).await);
    let res = client.add_favourite(603).await.unwrap();

    mock.assert_async().await;
    assert!(res.success);
    assert_eq!(res.data, json!({}));
}

#[tokio::test]
async fn test_validation_details_surface_per_field() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/auth/signup")
        .with_status(200)
        .with_body(r#"{"success": false, "error": {"details": {"email": ["Invalid email"]}}}"#)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(None).await);
    let err = client
        .signup(&cinemate::models::SignupRequest {
            name: "Ada".into(),
            email: "nope".into(),
            password: "x".into(),
            genres: None,
        })
        .await
        .unwrap_err();

    assert!(!err.success);
    assert_eq!(err.message, "email: Invalid email");
    let form = FormErrors::from(&err);
    assert_eq!(form.field("email"), Some("Invalid email"));
    assert!(form.toast.is_none());
}

#[tokio::test]
async fn test_server_error_without_body_uses_fallback() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/movies/genres")
        .with_status(503)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(None).await);
    let err = client.genres().await.unwrap_err();

    assert_eq!(err.message, "Could not load genres");
    assert_eq!(err.code(), Some("HTTP_503"));
}

#[tokio::test]
async fn test_transport_error_uses_fallback() {
    let client = ApiClient::with_base_url("http://127.0.0.1:1", store_with_token(None).await);
    let err = client.popular(None).await.unwrap_err();

    assert_eq!(err.message, "Could not load popular movies");
    assert!(err.is_transport());
    assert_eq!(err.code(), Some(codes::NETWORK_ERROR));
    assert_eq!(err.data, json!({}));
}

#[tokio::test]
async fn test_timeout_uses_fallback() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and hold connections without ever answering
    let silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let options = ClientOptions {
        base_url: format!("http://{}", addr),
        timeout: Duration::from_millis(200),
        ..ClientOptions::default()
    };
    let client = ApiClient::with_options(options, store_with_token(None).await);
    let err = client.genres().await.unwrap_err();

    assert_eq!(err.message, "Could not load genres");
    assert!(err.is_transport());
    assert_eq!(err.code(), Some(codes::TIMEOUT));
    assert_eq!(err.data, json!({}));

    silent.abort();
}

// =============================================================================
// Refresh and Retry
// =============================================================================

#[tokio::test]
async fn test_401_refreshes_then_retries_once() {
    let mut server = Server::new_async().await;

    let first = server
        .mock("GET", "/movies/favourites")
        .with_status(401)
        .with_body(UNAUTHORIZED_BODY)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH_ENDPOINT)
        .with_status(200)
        .with_body(r#"{"success": true, "data": {}}"#)
        .expect(1)
        .create_async()
        .await;
    let retry = server
        .mock("GET", "/movies/favourites")
        .with_status(200)
        .with_body(FAVOURITES_BODY)
        .expect(1)
        .create_async()
        .await;

    let expiry = Arc::new(CountingExpiry::default());
    let client = ApiClient::with_base_url(server.url(), store_with_token(Some("T1")).await)
        .with_expiry_handler(expiry.clone());
    let res = client.favourites().await.unwrap();

    first.assert_async().await;
    refresh.assert_async().await;
    retry.assert_async().await;
    assert_eq!(res.data.len(), 2);
    assert_eq!(expiry.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refreshed_token_used_for_retry() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/profile/info")
        .match_header("authorization", "Bearer OLD")
        .with_status(401)
        .with_body(UNAUTHORIZED_BODY)
        .create_async()
        .await;
    server
        .mock("POST", REFRESH_ENDPOINT)
        .with_status(200)
        .with_body(r#"{"success": true, "data": {"access_token": "NEW"}}"#)
        .create_async()
        .await;
    let retry = server
        .mock("GET", "/profile/info")
        .match_header("authorization", "Bearer NEW")
        .with_status(200)
        .with_body(r#"{"success": true, "data": {"id": 1, "email": "a@b.com"}}"#)
        .expect(1)
        .create_async()
        .await;

    let store = store_with_token(Some("OLD")).await;
    let client = ApiClient::with_base_url(server.url(), store.clone());
    let res = client.profile_info().await.unwrap();

    retry.assert_async().await;
    assert_eq!(res.data.id, "1");
    assert_eq!(store.get_item(TOKEN_KEY).await.unwrap().as_deref(), Some("NEW"));
}

#[tokio::test]
async fn test_retry_preserves_method_and_body() {
    let mut server = Server::new_async().await;

    let body = json!({"old_password": "a", "new_password": "b"});
    let first = server
        .mock("POST", "/profile/change-password")
        .match_body(Matcher::Json(body.clone()))
        .with_status(401)
        .with_body(UNAUTHORIZED_BODY)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", REFRESH_ENDPOINT)
        .with_status(200)
        .with_body(r#"{"success": true}"#)
        .create_async()
        .await;
    let retry = server
        .mock("POST", "/profile/change-password")
        .match_body(Matcher::Json(body))
        .with_status(200)
        .with_body(r#"{"success": true, "message": "Password changed"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(Some("T1")).await);
    let res = client
        .change_password(&cinemate::models::ChangePasswordRequest {
            old_password: "a".into(),
            new_password: "b".into(),
        })
        .await
        .unwrap();

    first.assert_async().await;
    retry.assert_async().await;
    assert_eq!(res.message, "Password changed");
}

#[tokio::test]
async fn test_second_401_is_not_retried_again() {
    let mut server = Server::new_async().await;

    let original = server
        .mock("GET", "/movies/recommendations")
        .with_status(401)
        .with_body(UNAUTHORIZED_BODY)
        .expect(2)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH_ENDPOINT)
        .with_status(200)
        .with_body(r#"{"success": true, "data": {}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(Some("T1")).await);
    let err = client.recommendations(None).await.unwrap_err();

    original.assert_async().await;
    refresh.assert_async().await;
    assert_eq!(err.message, "Token expired");
    assert_eq!(err.code(), Some("TOKEN_EXPIRED"));
}

#[tokio::test]
async fn test_failed_refresh_deletes_token_and_expires_session() {
    let mut server = Server::new_async().await;

    let original = server
        .mock("GET", "/profile/notifications")
        .with_status(401)
        .with_body(UNAUTHORIZED_BODY)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", REFRESH_ENDPOINT)
        .with_status(401)
        .with_body(r#"{"success": false, "message": "Refresh token invalid"}"#)
        .expect(1)
        .create_async()
        .await;

    let store = store_with_token(Some("T1")).await;
    let expiry = Arc::new(CountingExpiry::default());
    let client =
        ApiClient::with_base_url(server.url(), store.clone()).with_expiry_handler(expiry.clone());
    let err = client.notifications().await.unwrap_err();

    original.assert_async().await;
    refresh.assert_async().await;
    assert_eq!(err.message, "Token expired");
    assert_eq!(store.get_item(TOKEN_KEY).await.unwrap(), None);
    assert_eq!(expiry.calls.load(Ordering::SeqCst), 1);

    // Next request goes out without credentials
    let anonymous = server
        .mock("GET", "/movies/popular")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"data": {"results": []}}"#)
        .create_async()
        .await;
    let res = client.popular(None).await.unwrap();
    anonymous.assert_async().await;
    assert!(res.data.results.is_empty());
}

#[tokio::test]
async fn test_401_on_refresh_endpoint_does_not_recurse() {
    let mut server = Server::new_async().await;

    let refresh = server
        .mock("POST", REFRESH_ENDPOINT)
        .with_status(401)
        .with_body(r#"{"success": false, "message": "No refresh cookie"}"#)
        .expect(1)
        .create_async()
        .await;

    let expiry = Arc::new(CountingExpiry::default());
    let client = ApiClient::with_base_url(server.url(), store_with_token(Some("T1")).await)
        .with_expiry_handler(expiry.clone());
    let err = client.refresh_token().await.unwrap_err();

    refresh.assert_async().await;
    assert_eq!(err.message, "No refresh cookie");
    assert_eq!(expiry.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_requests_retry_independently() {
    let mut server = Server::new_async().await;

    for path in ["/movies/popular", "/movies/coming-soon"] {
        server
            .mock("GET", path)
            .with_status(401)
            .with_body(UNAUTHORIZED_BODY)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", path)
            .with_status(200)
            .with_body(r#"{"data": {"results": [{"id": 1, "title": "Heat"}]}}"#)
            .expect(1)
            .create_async()
            .await;
    }
    let refresh = server
        .mock("POST", REFRESH_ENDPOINT)
        .with_status(200)
        .with_body(r#"{"success": true}"#)
        .expect(2)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(Some("T1")).await);
    let (popular, upcoming) =
        futures::future::join(client.popular(None), client.coming_soon(None)).await;

    refresh.assert_async().await;
    assert_eq!(popular.unwrap().data.results[0].title, "Heat");
    assert_eq!(upcoming.unwrap().data.results[0].title, "Heat");
}

#[tokio::test]
async fn test_raw_request_delete_with_body() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("DELETE", "/movies/favourites")
        .match_body(Matcher::Json(json!({"movie_id": 78})))
        .with_status(200)
        .with_body(r#"{"success": true, "message": "Removed"}"#)
        .create_async()
        .await;

    let client = ApiClient::with_base_url(server.url(), store_with_token(Some("T1")).await);
    let res: cinemate::ApiResponse<Value> = client
        .request(
            ApiRequest::delete("/movies/favourites").body(json!({"movie_id": 78})),
            "Could not remove",
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(res.message, "Removed");
}
