// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use plateful_api::config::Config;
use plateful_api::db::{SessionStore, UserStore};
use plateful_api::models::{Profile, Role, User};
use plateful_api::routes::create_router;
use plateful_api::services::{
    credentials, AccountService, IdentityVerifier, Mailer, SessionAuthority,
};
use plateful_api::AppState;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[allow(dead_code)]
pub const TEST_KID: &str = "test-key";
#[allow(dead_code)]
pub const TEST_ID_TOKEN_SECRET: &[u8] = b"integration-test-id-token-secret";

/// Create a test app over in-memory stores with a pinned identity key.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let store = UserStore::new_memory();
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(30 * 60)));
    let identity = Arc::new(
        IdentityVerifier::new_with_static_key(
            &config,
            TEST_KID,
            DecodingKey::from_secret(TEST_ID_TOKEN_SECRET),
            Algorithm::HS256,
        )
        .expect("static identity verifier"),
    );
    let mailer = Mailer::new_mock();

    let authority = SessionAuthority::new(store.clone(), sessions.clone(), identity.clone());
    let accounts = AccountService::new(
        store.clone(),
        identity,
        mailer,
        config.frontend_url.clone(),
    );

    let state = Arc::new(AppState {
        config,
        store,
        sessions,
        authority,
        accounts,
    });

    (create_router(state.clone()), state)
}

/// Seed a user (with empty profile) directly into the store.
#[allow(dead_code)]
pub async fn seed_user(
    state: &Arc<AppState>,
    email: &str,
    password: &str,
    verified: bool,
    disabled: bool,
) -> User {
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.to_string(),
        name: "Seeded User".to_string(),
        password_hash: credentials::hash_password(password).expect("hash"),
        role: Role::Basic,
        disabled,
        verified,
        verification_token: if verified {
            String::new()
        } else {
            credentials::generate_token()
        },
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    state
        .store
        .create_user_with_profile(&user, &Profile::empty(&user.id))
        .await
        .expect("seed user");
    user
}

/// Mint a Google-shaped id-token signed with the pinned test key.
#[allow(dead_code)]
pub fn mint_google_id_token(email: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = serde_json::json!({
        "email": email,
        "aud": "test-google-client",
        "iss": "https://accounts.google.com",
        "iat": now,
        "exp": now + 3600,
    });
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());
    encode(&header, &claims, &EncodingKey::from_secret(TEST_ID_TOKEN_SECRET)).unwrap()
}

/// Build a JSON POST request.
#[allow(dead_code)]
pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a JSON POST request carrying a Cookie header.
#[allow(dead_code)]
pub fn post_json_with_cookies(uri: &str, body: serde_json::Value, cookies: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, cookies)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All Set-Cookie header values on a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// Extract the value of a named cookie from a response.
#[allow(dead_code)]
pub fn cookie_from(response: &Response, name: &str) -> Option<String> {
    set_cookie_headers(response)
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .and_then(|value| value.split(';').next().map(|pair| pair.to_string()))
        .and_then(|pair| {
            pair.split_once('=')
                .map(|(_, cookie_value)| cookie_value.to_string())
        })
}
