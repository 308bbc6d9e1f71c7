//! API integration tests for passkey-server.
//!
//! These drive full registration and authentication ceremonies through the
//! REST endpoints with a software authenticator standing in for the browser.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use passkey_core::testing::{SoftAuthenticator, FLAGS_UP_UV};
use passkey_core::{CeremonyPolicy, CreationOptions, PasskeyManager, RelyingParty, RequestOptions};
use passkey_server::{create_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const ORIGIN: &str = "https://localhost";

/// Build the test router with in-memory stores
fn create_test_app() -> Router {
    let rp = RelyingParty::new("localhost", "WebAuthn Demo", [ORIGIN]).unwrap();
    let passkeys = PasskeyManager::in_memory(rp, CeremonyPolicy::default());
    create_router(AppState::new(passkeys, false))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

/// Begin registration and return (state_token, options)
async fn register_begin(app: &Router, username: &str) -> (String, CreationOptions) {
    let (status, json) = post_json(app, "/register/begin", json!({ "username": username })).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let token = json["state_token"].as_str().unwrap().to_string();
    let options = serde_json::from_value(json["publicKey"].clone()).unwrap();
    (token, options)
}

async fn authenticate_begin(app: &Router, username: &str) -> (String, RequestOptions) {
    let (status, json) =
        post_json(app, "/authenticate/begin", json!({ "username": username })).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let token = json["state_token"].as_str().unwrap().to_string();
    let options = serde_json::from_value(json["publicKey"].clone()).unwrap();
    (token, options)
}

async fn register(app: &Router, username: &str, authenticator: &SoftAuthenticator) {
    let (token, options) = register_begin(app, username).await;
    let response = authenticator.register(&options, ORIGIN);
    let (status, json) = post_json(
        app,
        "/register/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();
    let (status, json) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "passkey-server");
    assert_eq!(json["rp_id"], "localhost");
    assert_eq!(json["persistent_storage"], false);
}

#[tokio::test]
async fn test_ready_endpoint() {
    let app = create_test_app();
    let (status, json) = get(&app, "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = create_test_app();
    let (status, json) = get(&app, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/register/begin"].is_object());
    assert!(json["paths"]["/authenticate/complete"].is_object());
}

// ============================================================================
// Registration Tests
// ============================================================================

#[tokio::test]
async fn test_register_begin_options() {
    let app = create_test_app();
    let (status, json) = post_json(
        &app,
        "/register/begin",
        json!({ "username": "bob", "display_name": "Bob" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let options = &json["publicKey"];
    assert_eq!(options["rp"]["id"], "localhost");
    assert_eq!(options["rp"]["name"], "WebAuthn Demo");
    assert_eq!(options["user"]["name"], "bob");
    assert_eq!(options["user"]["displayName"], "Bob");
    assert_eq!(options["attestation"], "none");
    assert_eq!(options["pubKeyCredParams"][0]["alg"], -7);
    assert_eq!(options["pubKeyCredParams"][1]["alg"], -257);
    assert!(options.get("excludeCredentials").is_none());
}

#[tokio::test]
async fn test_register_missing_username() {
    let app = create_test_app();

    for body in [json!({}), json!({ "username": "" }), json!({ "username": "   " })] {
        let (status, json) = post_json(&app, "/register/begin", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "validation_error");
        assert_eq!(json["message"], "no username provided");
    }
}

#[tokio::test]
async fn test_register_malformed_body() {
    let app = create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/register/begin")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation_error");
}

#[tokio::test]
async fn test_register_complete_success() {
    let app = create_test_app();
    let authenticator = SoftAuthenticator::es256();

    let (token, options) = register_begin(&app, "bob").await;
    let response = authenticator.register(&options, ORIGIN);
    let (status, json) = post_json(
        &app,
        "/register/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["username"], "bob");
    assert_eq!(json["credential_id"], response.id);
}

#[tokio::test]
async fn test_register_wrong_origin() {
    let app = create_test_app();
    let authenticator = SoftAuthenticator::es256();

    let (token, options) = register_begin(&app, "bob").await;
    let response = authenticator.register(&options, "https://evil.example");
    let (status, json) = post_json(
        &app,
        "/register/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "client_data_invalid");
}

#[tokio::test]
async fn test_register_same_credential_twice() {
    let app = create_test_app();
    let authenticator = SoftAuthenticator::es256();
    register(&app, "bob", &authenticator).await;

    let (token, options) = register_begin(&app, "bob").await;
    let excluded = options.exclude_credentials.len();
    assert_eq!(excluded, 1);

    let response = authenticator.register(&options, ORIGIN);
    let (status, json) = post_json(
        &app,
        "/register/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "duplicate_credential");
}

#[tokio::test]
async fn test_register_unknown_state_token() {
    let app = create_test_app();
    let authenticator = SoftAuthenticator::es256();

    let (_token, options) = register_begin(&app, "bob").await;
    let response = authenticator.register(&options, ORIGIN);
    let (status, json) = post_json(
        &app,
        "/register/complete",
        json!({ "state_token": "forged", "response": response }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "state_expired");
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_authenticate_unknown_user() {
    let app = create_test_app();
    let (status, json) =
        post_json(&app, "/authenticate/begin", json!({ "username": "alice" })).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "unknown_user");
}

#[tokio::test]
async fn test_full_ceremony_flow() {
    let app = create_test_app();
    let authenticator = SoftAuthenticator::es256();
    register(&app, "bob", &authenticator).await;

    let (token, options) = authenticate_begin(&app, "bob").await;
    assert_eq!(options.allow_credentials.len(), 1);

    let response = authenticator.authenticate(&options, ORIGIN, 1);
    let (status, json) = post_json(
        &app,
        "/authenticate/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["status"], "success");
    assert_eq!(json["username"], "bob");
    assert_eq!(json["sign_count"], 1);
}

#[tokio::test]
async fn test_rs256_flow() {
    let app = create_test_app();
    let authenticator = SoftAuthenticator::rs256();
    register(&app, "carol", &authenticator).await;

    let (token, options) = authenticate_begin(&app, "carol").await;
    let response = authenticator.authenticate(&options, ORIGIN, 3);
    let (status, json) = post_json(
        &app,
        "/authenticate/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["sign_count"], 3);
}

#[tokio::test]
async fn test_replayed_counter_rejected() {
    let app = create_test_app();
    let authenticator = SoftAuthenticator::es256();
    register(&app, "bob", &authenticator).await;

    let (token, options) = authenticate_begin(&app, "bob").await;
    let response = authenticator.authenticate(&options, ORIGIN, 5);
    let (status, _) = post_json(
        &app,
        "/authenticate/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (token, options) = authenticate_begin(&app, "bob").await;
    let response = authenticator.authenticate(&options, ORIGIN, 5);
    let (status, json) = post_json(
        &app,
        "/authenticate/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "possible_cloning");
}

#[tokio::test]
async fn test_tampered_signature_rejected() {
    let app = create_test_app();
    let authenticator = SoftAuthenticator::es256();
    register(&app, "bob", &authenticator).await;

    let (token, options) = authenticate_begin(&app, "bob").await;
    let mut response = authenticator.authenticate(&options, ORIGIN, 1);
    let last = response.response.signature.0.len() - 1;
    response.response.signature.0[last] ^= 0x01;

    let (status, json) = post_json(
        &app,
        "/authenticate/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "signature_invalid");
}

#[tokio::test]
async fn test_assertion_for_other_challenge_rejected() {
    let app = create_test_app();
    let authenticator = SoftAuthenticator::es256();
    register(&app, "bob", &authenticator).await;

    let (token, _options) = authenticate_begin(&app, "bob").await;
    let response = authenticator.sign_assertion("localhost", &[7u8; 32], ORIGIN, FLAGS_UP_UV, 1);
    let (status, json) = post_json(
        &app,
        "/authenticate/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "client_data_invalid");
}

#[tokio::test]
async fn test_state_token_single_use() {
    let app = create_test_app();
    let authenticator = SoftAuthenticator::es256();
    register(&app, "bob", &authenticator).await;

    let (token, options) = authenticate_begin(&app, "bob").await;
    let response = authenticator.authenticate(&options, ORIGIN, 1);
    let body = json!({ "state_token": token, "response": response });

    let (status, _) = post_json(&app, "/authenticate/complete", body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = post_json(&app, "/authenticate/complete", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "state_expired");
}

#[tokio::test]
async fn test_other_users_credential_rejected() {
    let app = create_test_app();
    let bob_key = SoftAuthenticator::es256();
    let carol_key = SoftAuthenticator::es256();
    register(&app, "bob", &bob_key).await;
    register(&app, "carol", &carol_key).await;

    let (token, options) = authenticate_begin(&app, "bob").await;
    let response = carol_key.authenticate(&options, ORIGIN, 1);
    let (status, json) = post_json(
        &app,
        "/authenticate/complete",
        json!({ "state_token": token, "response": response }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "credential_not_found");
}
