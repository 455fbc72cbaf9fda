mod common;

use common::{extract_token, TestApp};
use registration_service::services::SentMessage;
use registration_service::token::Action;
use reqwest::Client;

#[tokio::test]
async fn register_mints_a_token_pair_and_notifies_the_admin() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/register", app.address))
        .json(&serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "first_name": "Alice",
            "last_name": "A",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "pending_approval");
    assert!(!body["message"].as_str().unwrap().is_empty());

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    let SentMessage::ApprovalRequest {
        username,
        approve_url,
        deny_url,
    } = &sent[0]
    else {
        panic!("Expected an approval request, got {:?}", sent[0]);
    };
    assert_eq!(username, "alice");

    // Two distinct tokens carrying the same payload under different actions.
    let approve_token = extract_token(approve_url);
    let deny_token = extract_token(deny_url);
    assert_ne!(approve_token, deny_token);

    let approved = app
        .codec
        .decode(&approve_token, Action::Approve)
        .expect("Approve token should verify");
    let denied = app
        .codec
        .decode(&deny_token, Action::Deny)
        .expect("Deny token should verify");
    assert_eq!(approved, denied);
    assert_eq!(approved.username, "alice");
    assert_eq!(approved.email, "alice@example.com");
    assert_eq!(
        approved.expires_at - approved.submitted_at,
        chrono::Duration::days(7)
    );
}

#[tokio::test]
async fn register_rejects_missing_fields_by_name() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/register", app.address))
        .json(&serde_json::json!({
            "username": "alice",
            "first_name": "Alice",
            "last_name": "A",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["error"].as_str().unwrap().contains("email"));

    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn register_rejects_empty_fields_by_name() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/register", app.address))
        .json(&serde_json::json!({
            "username": "",
            "email": "alice@example.com",
            "first_name": "Alice",
            "last_name": "A",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert!(body["error"].as_str().unwrap().contains("username"));
}

#[tokio::test]
async fn register_rejects_invalid_email() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/register", app.address))
        .json(&serde_json::json!({
            "username": "alice",
            "email": "not-an-email",
            "first_name": "Alice",
            "last_name": "A",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn register_fails_when_the_admin_notification_fails() {
    let app = TestApp::spawn().await;
    app.notifier.set_fail_approval_request(true);
    let client = Client::new();

    let response = client
        .post(format!("{}/register", app.address))
        .json(&serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "first_name": "Alice",
            "last_name": "A",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "registration-service");
}
