//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::json;
use spendie_core::Period;
use tower::ServiceExt;

const SECRET: &str = "s3cret-token";

fn test_config(require_auth: bool) -> ServerConfig {
    ServerConfig {
        require_auth,
        allowed_origins: vec![],
        webhook_secret: Some(SECRET.to_string()),
        default_owner: "local".to_string(),
    }
}

fn setup_test_app_with(db: Database, require_auth: bool) -> Router {
    create_router(db, &Config::default(), test_config(require_auth))
}

fn setup_test_app() -> Router {
    setup_test_app_with(Database::in_memory().unwrap(), false)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_command(owner: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/commands")
        .header("content-type", "application/json")
        .header(OWNER_HEADER, owner)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Telegram update with a fixed timestamp (2024-01-20 12:00 UTC)
fn telegram_update(user_id: i64, text: &str) -> serde_json::Value {
    json!({
        "update_id": 1,
        "message": {
            "message_id": 7,
            "chat": { "id": 5000 + user_id, "type": "private" },
            "from": { "id": user_id, "is_bot": false, "first_name": "Test" },
            "date": 1_705_752_000,
            "text": text
        }
    })
}

// ========== Liveness Tests ==========

#[tokio::test]
async fn test_health_endpoints() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "healthy");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(get_body_text(response).await, "pong");

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

// ========== Command API Tests ==========

#[tokio::test]
async fn test_add_expense_command() {
    let app = setup_test_app();

    let response = app
        .oneshot(post_command(
            "alice",
            json!({
                "command": "add_expense",
                "amount": "250.50",
                "category": "food",
                "date": "2024-01-05",
                "description": "groceries"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["outcome"], "expense_added");
    assert_eq!(json["expense"]["owner"], "alice");
    assert_eq!(json["expense"]["amount"], "250.50");
    assert!(json["text"].as_str().unwrap().contains("Expense added"));
}

#[tokio::test]
async fn test_command_requires_owner_when_auth_enabled() {
    let app = setup_test_app_with(Database::in_memory().unwrap(), true);

    let response = app
        .clone()
        .oneshot(post_json("/api/commands", json!({ "command": "help" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Authentication required");

    let response = app
        .oneshot(post_command("bob", json!({ "command": "help" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_command_without_header_uses_default_owner() {
    let db = Database::in_memory().unwrap();
    let app = setup_test_app_with(db.clone(), false);

    let response = app
        .oneshot(post_json(
            "/api/commands",
            json!({
                "command": "add_expense",
                "amount": "10",
                "date": "2024-01-05"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.count_expenses("local").unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_command_is_bad_request() {
    let db = Database::in_memory().unwrap();
    let app = setup_test_app_with(db.clone(), false);

    let response = app
        .oneshot(post_command("alice", json!({ "command": "transfer_money" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "unknown command: transfer_money");
    assert_eq!(db.count_expenses("alice").unwrap(), 0);
}

#[tokio::test]
async fn test_validation_error_names_field() {
    let app = setup_test_app();

    let response = app
        .oneshot(post_command(
            "alice",
            json!({
                "command": "add_expense",
                "amount": "-5",
                "category": "food",
                "date": "2024-01-05"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("amount"));
}

#[tokio::test]
async fn test_missing_expense_is_not_found() {
    let app = setup_test_app();

    let response = app
        .oneshot(post_command(
            "alice",
            json!({ "command": "delete_expense", "id": 42 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("42"));
}

#[tokio::test]
async fn test_duplicate_budget_is_conflict() {
    let app = setup_test_app();
    let budget = json!({
        "command": "set_budget",
        "category": "food",
        "period": "2024-01",
        "limit": "1000"
    });

    let response = app
        .clone()
        .oneshot(post_command("alice", budget.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_command("alice", budget))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_owners_are_isolated() {
    let db = Database::in_memory().unwrap();
    let app = setup_test_app_with(db.clone(), true);

    let add = json!({
        "command": "add_expense",
        "amount": "99",
        "category": "food",
        "date": "2024-01-05"
    });
    app.clone()
        .oneshot(post_command("alice", add))
        .await
        .unwrap();

    let response = app
        .oneshot(post_command(
            "bob",
            json!({ "command": "list_expenses" }),
        ))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["outcome"], "expenses");
    assert!(json["expenses"].as_array().unwrap().is_empty());
    assert_eq!(db.count_expenses("alice").unwrap(), 1);
}

// ========== Export Tests ==========

#[tokio::test]
async fn test_export_csv() {
    let app = setup_test_app();
    app.clone()
        .oneshot(post_command(
            "alice",
            json!({
                "command": "add_expense",
                "amount": "12.5",
                "category": "coffee",
                "date": "2024-01-05",
                "description": "latte, large"
            }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/export?range=2024-01")
                .header(OWNER_HEADER, "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let csv = get_body_text(response).await;
    assert!(csv.starts_with("date,category,amount,description"));
    assert!(csv.contains("2024-01-05,coffee,12.5,\"latte, large\""));
}

#[tokio::test]
async fn test_export_bad_range() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/export?range=someday")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Webhook Tests ==========

#[tokio::test]
async fn test_webhook_rejects_wrong_secret() {
    let db = Database::in_memory().unwrap();
    let app = setup_test_app_with(db.clone(), true);

    let response = app
        .oneshot(post_json("/webhook/wrong", telegram_update(1, "spent 50 on tea")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(db.count_expenses("telegram:1").unwrap(), 0);
}

#[tokio::test]
async fn test_webhook_disabled_without_secret() {
    let config = ServerConfig {
        webhook_secret: None,
        ..test_config(false)
    };
    let app = create_router(Database::in_memory().unwrap(), &Config::default(), config);

    let response = app
        .oneshot(post_json(
            &format!("/webhook/{}", SECRET),
            telegram_update(1, "/help"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_replies_inline() {
    let db = Database::in_memory().unwrap();
    let app = setup_test_app_with(db.clone(), true);
    let uri = format!("/webhook/{}", SECRET);

    let response = app
        .clone()
        .oneshot(post_json(&uri, telegram_update(7, "/budget set food 1000")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(&uri, telegram_update(7, "Spent ₹850 on food")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["method"], "sendMessage");
    assert_eq!(json["chat_id"], 5007);
    let text = json["text"].as_str().unwrap();
    assert!(text.contains("Expense added"));
    assert!(text.contains("80%"));

    // The message timestamp decides the budget month
    let alerts = db
        .list_alerts("telegram:7", Some(Period::new(2024, 1).unwrap()))
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].threshold, dec!(0.8));
}

#[tokio::test]
async fn test_webhook_reports_errors_as_replies() {
    let app = setup_test_app();

    let response = app
        .oneshot(post_json(
            &format!("/webhook/{}", SECRET),
            telegram_update(3, "/frobnicate"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json["text"]
        .as_str()
        .unwrap()
        .contains("unknown command: frobnicate"));
}

#[tokio::test]
async fn test_webhook_ignores_updates_without_text() {
    let app = setup_test_app();

    let response = app
        .oneshot(post_json(
            &format!("/webhook/{}", SECRET),
            json!({ "update_id": 9, "edited_message": { "text": "hi" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
