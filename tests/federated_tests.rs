// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration tests for federated sign-in and the session artifact.

mod common;

use axum::http::StatusCode;
use common::*;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

async fn google_sign_in(
    app: &axum::Router,
    email: &str,
) -> (StatusCode, Option<String>, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users/google-signin",
            json!({"idToken": mint_google_id_token(email)}),
        ))
        .await
        .unwrap();
    let status = response.status();
    let artifact = cookie_from(&response, "plateful_identity");
    (status, artifact, body_json(response).await)
}

#[tokio::test]
async fn test_first_sign_in_creates_account() {
    let (app, state) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/users/google-signin",
            json!({"idToken": mint_google_id_token("fed@example.com")}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let set_cookie = set_cookie_headers(&response)
        .into_iter()
        .find(|value| value.starts_with("plateful_identity="))
        .expect("artifact cookie set");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Secure"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "fed@example.com");
    // No verified display name in this flow, so the email doubles as one.
    assert_eq!(body["user"]["name"], "fed@example.com");
    assert!(body["profile"]["diet"].is_null());

    let user = state
        .store
        .find_user_by_email("fed@example.com")
        .await
        .unwrap()
        .expect("user persisted");
    assert!(user.verified);
}

#[tokio::test]
async fn test_returning_sign_in_reuses_account() {
    let (app, state) = create_test_app();

    let (status, _, _) = google_sign_in(&app, "fed@example.com").await;
    assert_eq!(status, StatusCode::CREATED);
    let first_id = state
        .store
        .find_user_by_email("fed@example.com")
        .await
        .unwrap()
        .unwrap()
        .id;

    let (status, artifact, body) = google_sign_in(&app, "fed@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert!(artifact.is_some());
    assert_eq!(body["user"]["email"], "fed@example.com");

    let second_id = state
        .store
        .find_user_by_email("fed@example.com")
        .await
        .unwrap()
        .unwrap()
        .id;
    assert_eq!(first_id, second_id);
}

#[tokio::test]
async fn test_concurrent_first_sign_ins_share_one_account() {
    let (app, state) = create_test_app();
    let token = mint_google_id_token("raced@example.com");

    let (first, second) = tokio::join!(
        app.clone().oneshot(post_json(
            "/api/users/google-signin",
            json!({"idToken": token.clone()}),
        )),
        app.clone().oneshot(post_json(
            "/api/users/google-signin",
            json!({"idToken": token.clone()}),
        ))
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    // Both succeed; only one of them can have created the account.
    assert!(first.status().is_success());
    assert!(second.status().is_success());
    assert_eq!(
        [first.status(), second.status()]
            .iter()
            .filter(|status| **status == StatusCode::CREATED)
            .count(),
        1
    );

    for response in [first, second] {
        assert!(cookie_from(&response, "plateful_identity").is_some());
        let body = body_json(response).await;
        assert_eq!(body["user"]["email"], "raced@example.com");
    }

    assert!(state
        .store
        .find_user_by_email("raced@example.com")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_invalid_id_token_is_unauthorized() {
    let (app, state) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/users/google-signin",
            json!({"idToken": "not.a.jwt"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(state
        .store
        .find_user_by_email("fed@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_facebook_sign_in_uses_facebook_audience() {
    let (app, _state) = create_test_app();

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = json!({
        "email": "fb@example.com",
        "aud": "test-facebook-app",
        "iss": "https://www.facebook.com",
        "iat": now,
        "exp": now + 3600,
    });
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());
    let token = encode(&header, &claims, &EncodingKey::from_secret(TEST_ID_TOKEN_SECRET)).unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users/facebook-signin",
            json!({"idToken": token.clone()}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // A Facebook-audience token is not valid for the Google endpoint.
    let response = app
        .oneshot(post_json(
            "/api/users/google-signin",
            json!({"idToken": token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_artifact_authenticates_auth_check() {
    let (app, _state) = create_test_app();
    let (_, artifact, _) = google_sign_in(&app, "fed@example.com").await;

    let response = app
        .oneshot(post_json_with_cookies(
            "/api/session/auth-check",
            json!({}),
            &format!("plateful_identity={}", artifact.unwrap()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "fed@example.com");
}

#[tokio::test]
async fn test_artifact_takes_precedence_over_session() {
    let (app, state) = create_test_app();
    seed_user(&state, "local@example.com", "longenough1", true, false).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/session/login",
            json!({"email": "local@example.com", "password": "longenough1"}),
        ))
        .await
        .unwrap();
    let session = cookie_from(&response, "plateful_sid").unwrap();

    let (_, artifact, _) = google_sign_in(&app, "fed@example.com").await;
    let artifact = artifact.unwrap();

    let response = app
        .oneshot(post_json_with_cookies(
            "/api/session/auth-check",
            json!({}),
            &format!("plateful_identity={artifact}; plateful_sid={session}"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "fed@example.com");
}

#[tokio::test]
async fn test_tampered_artifact_does_not_fall_through_to_session() {
    let (app, state) = create_test_app();
    seed_user(&state, "local@example.com", "longenough1", true, false).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/session/login",
            json!({"email": "local@example.com", "password": "longenough1"}),
        ))
        .await
        .unwrap();
    let session = cookie_from(&response, "plateful_sid").unwrap();

    let (_, artifact, _) = google_sign_in(&app, "fed@example.com").await;
    let tampered = format!("{}x", artifact.unwrap());

    // An invalid artifact is terminal, even with a live session attached.
    let response = app
        .oneshot(post_json_with_cookies(
            "/api/session/auth-check",
            json!({}),
            &format!("plateful_identity={tampered}; plateful_sid={session}"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_artifact_rejects_disabled_account() {
    let (app, state) = create_test_app();
    let (_, artifact, _) = google_sign_in(&app, "fed@example.com").await;

    let mut user = state
        .store
        .find_user_by_email("fed@example.com")
        .await
        .unwrap()
        .unwrap();
    user.disabled = true;
    state.store.update_user(&user).await.unwrap();

    let response = app
        .oneshot(post_json_with_cookies(
            "/api/session/auth-check",
            json!({}),
            &format!("plateful_identity={}", artifact.unwrap()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_in_verifies_password_account() {
    let (app, state) = create_test_app();
    seed_user(&state, "mixed@example.com", "longenough1", false, false).await;

    // Provider proof of the email also verifies the password account.
    let (status, _, _) = google_sign_in(&app, "mixed@example.com").await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/api/session/login",
            json!({"email": "mixed@example.com", "password": "longenough1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_with_artifact_returns_view() {
    let (app, _state) = create_test_app();
    let (_, artifact, _) = google_sign_in(&app, "fed@example.com").await;

    let response = app
        .oneshot(post_json_with_cookies(
            "/api/session/refresh",
            json!({}),
            &format!("plateful_identity={}", artifact.unwrap()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "fed@example.com");
}
