//! HTTP-level tests for the API router

use super::*;
use crate::db::repositories::{SqlxItemRepository, SqlxUserRepository, UserRepository};
use crate::db::{create_test_pool, migrations};
use crate::services::mail::RecordingMailTransport;
use crate::services::{MutationService, TokenIssuer};
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

const SECRET: &str = "api-test-secret";

struct TestApp {
    server: TestServer,
    users: Arc<dyn UserRepository>,
    mailer: Arc<RecordingMailTransport>,
}

async fn setup() -> TestApp {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let users = SqlxUserRepository::boxed(pool.clone());
    let mailer = Arc::new(RecordingMailTransport::new());
    let mutations = MutationService::new(
        users.clone(),
        SqlxItemRepository::boxed(pool.clone()),
        TokenIssuer::new(SECRET),
        mailer.clone(),
        "http://localhost:7777",
        "shop@example.com",
    );
    let state = AppState {
        pool,
        mutations: Arc::new(mutations),
    };
    let app = build_router(state, "http://localhost:7777").expect("Failed to build router");

    TestApp {
        server: TestServer::new(app).expect("Failed to start test server"),
        users,
        mailer,
    }
}

fn signup_body(email: &str) -> Value {
    json!({ "name": "Wes", "email": email, "password": "dogs4life" })
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;

    let response = app.server.get("/api/v1/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "sqlite");
}

#[tokio::test]
async fn test_item_lifecycle() {
    let app = setup().await;

    let created = app
        .server
        .post("/api/v1/items")
        .json(&json!({
            "title": "Hat",
            "description": "A wide brim",
            "largeImage": "hat-large.jpg",
            "price": 1500
        }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let item: Value = created.json();
    let id = item["id"].as_i64().expect("Item should have an id");
    assert_eq!(item["largeImage"], "hat-large.jpg");
    assert!(item["image"].is_null());

    let updated = app
        .server
        .put(&format!("/api/v1/items/{}", id))
        .json(&json!({ "price": 2000 }))
        .await;
    updated.assert_status_ok();
    let item: Value = updated.json();
    assert_eq!(item["price"], 2000);
    assert_eq!(item["title"], "Hat");

    let deleted = app.server.delete(&format!("/api/v1/items/{}", id)).await;
    deleted.assert_status_ok();
    assert_eq!(deleted.json::<Value>()["id"], id);

    let missing = app.server.delete(&format!("/api/v1/items/{}", id)).await;
    missing.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(missing.json::<Value>()["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_update_null_clears_image() {
    let app = setup().await;
    let created: Value = app
        .server
        .post("/api/v1/items")
        .json(&json!({
            "title": "Scarf",
            "description": "Wool",
            "image": "scarf.jpg",
            "largeImage": "scarf-large.jpg",
            "price": 900
        }))
        .await
        .json();
    let id = created["id"].as_i64().expect("Item should have an id");

    let response = app
        .server
        .put(&format!("/api/v1/items/{}", id))
        .json(&json!({ "image": null }))
        .await;

    response.assert_status_ok();
    let item: Value = response.json();
    assert!(item["image"].is_null());
    assert_eq!(item["largeImage"], "scarf-large.jpg");
}

#[tokio::test]
async fn test_update_unknown_item_is_404() {
    let app = setup().await;

    let response = app
        .server
        .put("/api/v1/items/999")
        .json(&json!({ "title": "Nope" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["message"], "Item 999 not found");
}

#[tokio::test]
async fn test_signup_sets_session_cookie() {
    let app = setup().await;

    let response = app
        .server
        .post("/api/v1/auth/signup")
        .json(&signup_body("Wes@Example.com"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let user: Value = response.json();
    assert_eq!(user["email"], "wes@example.com");
    assert_eq!(user["permissions"], json!(["USER"]));
    assert!(user.get("passwordHash").is_none());

    let cookie = response.cookie("token");
    let claims = TokenIssuer::new(SECRET)
        .verify(cookie.value())
        .expect("Cookie should hold a valid token");
    assert_eq!(Some(claims.user_id), user["id"].as_i64());

    let header = response.header("set-cookie");
    let header = header.to_str().unwrap();
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("Max-Age=31536000"));
}

#[tokio::test]
async fn test_duplicate_signup_is_conflict() {
    let app = setup().await;
    app.server
        .post("/api/v1/auth/signup")
        .json(&signup_body("wes@example.com"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = app
        .server
        .post("/api/v1/auth/signup")
        .json(&signup_body("wes@example.com"))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signin_and_me() {
    let app = setup().await;
    app.server
        .post("/api/v1/auth/signup")
        .json(&signup_body("wes@example.com"))
        .await;

    let signin = app
        .server
        .post("/api/v1/auth/signin")
        .json(&json!({ "email": "wes@example.com", "password": "dogs4life" }))
        .await;
    signin.assert_status_ok();
    let cookie = signin.cookie("token");

    let me = app.server.get("/api/v1/auth/me").add_cookie(cookie).await;
    me.assert_status_ok();
    assert_eq!(me.json::<Value>()["email"], "wes@example.com");

    let anonymous = app.server.get("/api/v1/auth/me").await;
    anonymous.assert_status_ok();
    assert!(anonymous.json::<Value>().is_null());
}

#[tokio::test]
async fn test_signin_failures() {
    let app = setup().await;
    app.server
        .post("/api/v1/auth/signup")
        .json(&signup_body("wes@example.com"))
        .await;

    let unknown = app
        .server
        .post("/api/v1/auth/signin")
        .json(&json!({ "email": "ghost@example.com", "password": "x" }))
        .await;
    unknown.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        unknown.json::<Value>()["error"]["message"],
        "No user found for email ghost@example.com"
    );

    let wrong = app
        .server
        .post("/api/v1/auth/signin")
        .json(&json!({ "email": "wes@example.com", "password": "cats4life" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>()["error"]["message"], "Invalid Password");
}

#[tokio::test]
async fn test_signout_clears_cookie() {
    let app = setup().await;

    let response = app.server.post("/api/v1/auth/signout").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "message": "Goodbye!" }));
    let header = response.header("set-cookie");
    let header = header.to_str().unwrap();
    assert!(header.starts_with("token=;"));
    assert!(header.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = setup().await;
    app.server
        .post("/api/v1/auth/signup")
        .json(&signup_body("wes@example.com"))
        .await;

    let requested = app
        .server
        .post("/api/v1/auth/request-reset")
        .json(&json!({ "email": "wes@example.com" }))
        .await;
    requested.assert_status_ok();
    assert_eq!(requested.json::<Value>(), json!({ "message": "Thanks!" }));

    let token = app
        .users
        .get_by_email("wes@example.com")
        .await
        .unwrap()
        .and_then(|u| u.reset_token)
        .expect("Reset token should be stored");
    assert_eq!(app.mailer.sent().len(), 1);
    assert!(app.mailer.sent()[0].html.contains(&token));

    let mismatch = app
        .server
        .post("/api/v1/auth/reset-password")
        .json(&json!({
            "password": "new-one",
            "confirmPassword": "new-two",
            "resetToken": token
        }))
        .await;
    mismatch.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        mismatch.json::<Value>()["error"]["message"],
        "Passwords don't match"
    );

    let reset = app
        .server
        .post("/api/v1/auth/reset-password")
        .json(&json!({
            "password": "cats4life",
            "confirmPassword": "cats4life",
            "resetToken": token
        }))
        .await;
    reset.assert_status_ok();
    let user: Value = reset.json();
    let claims = TokenIssuer::new(SECRET)
        .verify(reset.cookie("token").value())
        .expect("Cookie should hold a valid token");
    assert_eq!(Some(claims.user_id), user["id"].as_i64());

    let reused = app
        .server
        .post("/api/v1/auth/reset-password")
        .json(&json!({
            "password": "again",
            "confirmPassword": "again",
            "resetToken": token
        }))
        .await;
    reused.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        reused.json::<Value>()["error"]["message"],
        "This token is either expired or invalid"
    );
}

#[tokio::test]
async fn test_request_reset_unknown_email_is_404() {
    let app = setup().await;

    let response = app
        .server
        .post("/api/v1/auth/request-reset")
        .json(&json!({ "email": "ghost@example.com" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(app.mailer.sent().is_empty());
}
