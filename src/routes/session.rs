// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! First-party session routes: login, logout, auth-check, refresh.

use crate::db::sessions::DEFAULT_SESSION_TTL;
use crate::error::Result;
use crate::models::AccountView;
use crate::routes::{cookie_value, ARTIFACT_COOKIE, SESSION_COOKIE};
use crate::services::RefreshOutcome;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session/login", post(login))
        .route("/api/session/logout", post(logout))
        .route("/api/session/auth-check", post(auth_check))
        .route("/api/session/refresh", post(refresh))
}

/// Login request body.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please enter your password"))]
    pub password: String,
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(DEFAULT_SESSION_TTL.as_secs() as i64))
        .build()
}

/// Removal cookie with attributes matching the creation attributes.
fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::from(name);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AccountView>)> {
    let previous = cookie_value(&jar, SESSION_COOKIE);

    if let Err(errors) = body.validate() {
        // Malformed login attempts also tear down any existing session.
        state.authority.logout(previous.as_deref());
        return Err(errors.into());
    }

    let (session_id, view) = state
        .authority
        .login(previous.as_deref(), &body.email, &body.password)
        .await?;

    Ok((jar.add(session_cookie(session_id)), Json(view)))
}

async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    state
        .authority
        .logout(cookie_value(&jar, SESSION_COOKIE).as_deref());

    let jar = jar
        .remove(removal_cookie(SESSION_COOKIE))
        .remove(removal_cookie(ARTIFACT_COOKIE));

    (jar, StatusCode::NO_CONTENT)
}

async fn auth_check(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<AccountView>> {
    let artifact = cookie_value(&jar, ARTIFACT_COOKIE);
    let session = cookie_value(&jar, SESSION_COOKIE);

    let view = state
        .authority
        .auth_check(artifact.as_deref(), session.as_deref())
        .await?;
    Ok(Json(view))
}

#[derive(Serialize)]
struct RefreshResponse {
    status: &'static str,
}

async fn refresh(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<Response> {
    let artifact = cookie_value(&jar, ARTIFACT_COOKIE);
    let session = cookie_value(&jar, SESSION_COOKIE);

    match state
        .authority
        .refresh(artifact.as_deref(), session.as_deref())
        .await?
    {
        RefreshOutcome::Federated(view) => Ok(Json(view).into_response()),
        RefreshOutcome::Extended => Ok(Json(RefreshResponse { status: "OK" }).into_response()),
    }
}
