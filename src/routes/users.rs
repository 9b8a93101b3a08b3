// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle routes: registration, verification, federated sign-in.

use crate::error::Result;
use crate::models::RegisteredUser;
use crate::routes::{cookie_value, ARTIFACT_COOKIE, SESSION_COOKIE};
use crate::services::identity::{Provider, ARTIFACT_TTL};
use crate::services::RegisterRequest;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", post(register))
        .route("/api/users/verify-email", post(verify_email))
        .route("/api/users/reverify-email", post(re_verify_email))
        .route("/api/users/google-signin", post(google_sign_in))
        .route("/api/users/facebook-signin", post(facebook_sign_in))
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>)> {
    // Registration never proceeds with an authenticated session attached.
    state
        .authority
        .logout(cookie_value(&jar, SESSION_COOKIE).as_deref());

    let created = state.accounts.register(body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
struct VerifyEmailRequest {
    key: String,
}

async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<StatusCode> {
    state.accounts.verify_email(&body.key).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ReVerifyEmailRequest {
    email: String,
}

async fn re_verify_email(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReVerifyEmailRequest>,
) -> Result<StatusCode> {
    state.accounts.re_verify_email(&body.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FederatedSignInRequest {
    id_token: String,
}

fn artifact_cookie(value: String) -> Cookie<'static> {
    Cookie::build((ARTIFACT_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(ARTIFACT_TTL.as_secs() as i64))
        .build()
}

async fn federated_sign_in(
    state: Arc<AppState>,
    jar: CookieJar,
    provider: Provider,
    id_token: String,
) -> Response {
    let (email, artifact) = match state.accounts.verify_federated(provider, &id_token).await {
        Ok(verified) => verified,
        Err(err) => return err.into_response(),
    };

    // From here on the artifact cookie rides on every response, errors
    // included: its validity is independent of local account state.
    let jar = jar.add(artifact_cookie(artifact));

    match state.accounts.federated_sign_in(provider, &email).await {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, jar, Json(outcome.view)).into_response()
        }
        Err(err) => (jar, err).into_response(),
    }
}

async fn google_sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<FederatedSignInRequest>,
) -> Response {
    federated_sign_in(state, jar, Provider::Google, body.id_token).await
}

async fn facebook_sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<FederatedSignInRequest>,
) -> Response {
    federated_sign_in(state, jar, Provider::Facebook, body.id_token).await
}
