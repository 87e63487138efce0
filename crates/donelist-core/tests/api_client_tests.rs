//! Integration tests for the session-aware API client

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use donelist_core::api::ApiError;
use donelist_core::auth::storage::{EXPIRES_AT_KEY, TOKEN_KEY, USER_KEY};
use donelist_core::auth::token::encode_unsigned;
use donelist_core::auth::{Clock, ManualClock, MemoryStorage, SessionStorage};
use donelist_core::models::{NewTodo, RepeatRule, Todo};
use donelist_core::navigation::{DEFAULT_PATH, LOGIN_PATH};
use donelist_core::SessionContext;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    storage: Arc<MemoryStorage>,
    clock: ManualClock,
    ctx: SessionContext,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let clock = ManualClock::new(chrono::Utc::now());
    let ctx = SessionContext::new(
        storage.clone(),
        Arc::new(clock.clone()),
        &server.uri(),
        Duration::from_secs(5),
    )
    .expect("context should build");
    Harness {
        server,
        storage,
        clock,
        ctx,
    }
}

impl Harness {
    fn token_expiring_in(&self, secs: i64) -> String {
        encode_unsigned((self.clock.now() + ChronoDuration::seconds(secs)).timestamp(), Some(1))
    }

    /// Put a valid session in storage and start the context on the todo list.
    fn logged_in(&self, ttl_secs: i64) -> String {
        let token = self.token_expiring_in(ttl_secs);
        self.storage.set(TOKEN_KEY, &token).unwrap();
        self.storage
            .set(USER_KEY, r#"{"id":1,"username":"ada"}"#)
            .unwrap();
        assert_eq!(self.ctx.start("/"), DEFAULT_PATH);
        token
    }
}

#[tokio::test]
async fn test_login_stores_token_and_user() {
    let h = harness().await;
    assert_eq!(h.ctx.start("/"), LOGIN_PATH);
    let token = h.token_expiring_in(3600);

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"username": "ada", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "username": "ada"})))
        .expect(1)
        .mount(&h.server)
        .await;

    let user = h.ctx.login("ada", "hunter2").await.unwrap();
    assert_eq!(user.username, "ada");

    let session = h.ctx.session();
    assert!(session.is_authenticated());
    assert_eq!(session.user(), Some(user));
    assert_eq!(h.storage.get(TOKEN_KEY).unwrap(), Some(token));
    assert!(h.storage.get(EXPIRES_AT_KEY).unwrap().is_some());
    assert!(h.storage.get(USER_KEY).unwrap().is_some());
    assert_eq!(h.ctx.navigator().current_path().as_deref(), Some(DEFAULT_PATH));
}

#[tokio::test]
async fn test_login_rejects_expired_token_from_server() {
    let h = harness().await;
    let stale = h.token_expiring_in(-60);

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": stale })))
        .mount(&h.server)
        .await;

    let result = h.ctx.login("ada", "hunter2").await;
    assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    assert!(h.ctx.session().token().is_none());
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_login_with_wrong_password_reports_bad_credentials() {
    let h = harness().await;
    assert_eq!(h.ctx.start("/"), LOGIN_PATH);

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h.ctx.login("ada", "wrong").await;
    let err = result.unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials));
    assert!(!err.is_auth_failure());
    assert_eq!(err.to_string(), "Invalid username or password");
    assert!(!h.ctx.session().is_authenticated());
    assert!(h.storage.is_empty());
    assert_eq!(h.ctx.navigator().current_path().as_deref(), Some(LOGIN_PATH));
}

#[tokio::test]
async fn test_failed_user_lookup_rolls_back_login() {
    let h = harness().await;
    let token = h.token_expiring_in(3600);

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    let result = h.ctx.login("ada", "hunter2").await;
    assert!(matches!(result, Err(ApiError::ServerError(_))));
    assert!(!h.ctx.session().is_authenticated());
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_unauthenticated_request_has_no_authorization() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9, "username": "grace"})))
        .mount(&h.server)
        .await;

    let user = h.ctx.api().register("grace", "pw").await.unwrap();
    assert_eq!(user.id, 9);

    let received = h.server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
    assert_eq!(
        received[0].headers.get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let h = harness().await;
    let token = h.logged_in(3600);

    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "Water plants", "description": "", "repeat": "WEEKLY", "completed": false}
        ])))
        .expect(1)
        .mount(&h.server)
        .await;

    let todos = h.ctx.api().list_todos().await.unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].repeat, RepeatRule::Weekly);
}

#[tokio::test]
async fn test_unauthorized_response_ends_session() {
    let h = harness().await;
    h.logged_in(3600);

    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h.ctx.api().list_todos().await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert!(!h.ctx.session().is_authenticated());
    assert!(h.ctx.session().user().is_none());
    assert!(h.storage.is_empty());
    assert_eq!(h.ctx.navigator().current_path().as_deref(), Some(LOGIN_PATH));
}

#[tokio::test]
async fn test_expired_token_never_reaches_server() {
    let h = harness().await;
    h.logged_in(10);

    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&h.server)
        .await;

    h.clock.advance(ChronoDuration::seconds(11));
    let result = h.ctx.api().list_todos().await;

    assert!(matches!(result, Err(ApiError::SessionExpired)));
    assert!(h.ctx.session().token().is_none());
    assert!(h.storage.is_empty());
    assert_eq!(h.ctx.navigator().current_path().as_deref(), Some(LOGIN_PATH));
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_other_errors_pass_through() {
    let h = harness().await;
    h.logged_in(3600);

    Mock::given(method("DELETE"))
        .and(path("/api/todos/42"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such todo"))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.server)
        .await;

    let deleted = h.ctx.api().delete_todo(42).await;
    assert!(matches!(deleted, Err(ApiError::NotFound(body)) if body == "no such todo"));

    let listed = h.ctx.api().list_todos().await;
    assert!(matches!(listed, Err(ApiError::ServerError(_))));

    assert!(h.ctx.session().is_authenticated());
    assert_eq!(h.ctx.navigator().current_path().as_deref(), Some(DEFAULT_PATH));
}

#[tokio::test]
async fn test_concurrent_unauthorized_responses_clear_safely() {
    let h = harness().await;
    h.logged_in(3600);

    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(20)))
        .expect(2)
        .mount(&h.server)
        .await;

    let api = h.ctx.api();
    let (first, second) = futures::join!(api.list_todos(), api.list_todos());

    assert!(matches!(first, Err(ApiError::Unauthorized)));
    assert!(matches!(second, Err(ApiError::Unauthorized)));
    assert_eq!(h.ctx.session().state(), Default::default());
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_todo_writes() {
    let h = harness().await;
    h.logged_in(3600);

    let created = json!({"id": 5, "title": "Call mom", "description": "", "repeat": "NEVER", "completed": false});
    Mock::given(method("POST"))
        .and(path("/api/todos"))
        .and(body_json(json!({"title": "Call mom", "description": "", "repeat": "NEVER"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(&created))
        .expect(1)
        .mount(&h.server)
        .await;

    let todo = h.ctx.api().create_todo(&NewTodo::titled("Call mom")).await.unwrap();
    assert_eq!(todo.id, 5);

    let done = Todo {
        completed: true,
        ..todo
    };
    Mock::given(method("PUT"))
        .and(path("/api/todos/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&done))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/todos/5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    assert!(h.ctx.api().update_todo(&done).await.unwrap().completed);
    h.ctx.api().delete_todo(5).await.unwrap();
}
