/// Integration tests for customer registration, login and listing

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{unique_email, TestContext};
use serde_json::{json, Value};

fn registration(email: &str) -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": email,
        "phone": "555-0100",
        "password": "analytical-engine",
        "confirmPassword": "analytical-engine",
    })
}

async fn count_users(ctx: &TestContext, email: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(&ctx.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_returns_token() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();

    let (status, body) = ctx.post_json("/api/auth/register", registration(&email)).await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert!(body["id"].is_string());
    assert_eq!(body["firstName"], "Ada");
    assert_eq!(body["lastName"], "Lovelace");
    assert_eq!(body["email"], email.as_str());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_is_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();

    let (status, _) = ctx.post_json("/api/auth/register", registration(&email)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx.post_json("/api/auth/register", registration(&email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["message"], "Email already exists");

    assert_eq!(count_users(&ctx, &email).await, 1);
}

#[tokio::test]
async fn test_register_password_mismatch() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();

    let mut req = registration(&email);
    req["confirmPassword"] = json!("something-else");

    let (status, body) = ctx.post_json("/api/auth/register", req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["message"], "Passwords do not match");

    assert_eq!(count_users(&ctx, &email).await, 0);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .post_json("/api/auth/register", json!({ "email": unique_email() }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"].as_array().is_some_and(|d| d.len() >= 4));
}

#[tokio::test]
async fn test_register_malformed_json() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send(
            Request::post("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_login_success_and_token_identifies_user() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();

    let (_, registered) = ctx.post_json("/api/auth/register", registration(&email)).await;

    let (status, body) = ctx
        .post_json(
            "/api/auth/login",
            json!({ "email": email, "password": "analytical-engine" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["id"], registered["id"]);
    assert_eq!(body["email"], email.as_str());

    let token = body["token"].as_str().unwrap();
    let (status, me) = ctx
        .send(
            Request::get("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], registered["id"]);
    assert_eq!(me["phone"], "555-0100");
    assert!(me.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_login_wrong_password() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();

    ctx.post_json("/api/auth/register", registration(&email)).await;

    let (status, body) = ctx
        .post_json("/api/auth/login", json!({ "email": email, "password": "wrong" }))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn test_login_unknown_email_same_message() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .post_json(
            "/api/auth/login",
            json!({ "email": unique_email(), "password": "whatever" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_login_missing_fields() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.post_json("/api/auth/login", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_list_customers_includes_registered_user() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();

    ctx.post_json("/api/auth/register", registration(&email)).await;

    let (status, body) = ctx.get("/api/auth/customers").await;

    assert_eq!(status, StatusCode::OK);
    let customers = body.as_array().unwrap();
    let found = customers
        .iter()
        .find(|c| c["email"] == email.as_str())
        .expect("registered customer missing from list");
    assert!(found.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_me_requires_valid_token() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .send(
            Request::get("/api/auth/me")
                .header(header::AUTHORIZATION, "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .send(
            Request::get("/api/auth/me")
                .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
