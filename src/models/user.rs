// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User identity records and their outbound projections.

use crate::models::profile::ClientProfile;
use serde::{Deserialize, Serialize};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Basic,
    Admin,
}

/// User identity record stored in Firestore.
///
/// `password_hash` is always set; federated-only accounts get a random
/// throwaway hash that can never match a login attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Document ID (uuid string)
    pub id: String,
    /// Email address (globally unique)
    pub email: String,
    /// Display name
    pub name: String,
    /// Argon2 PHC-format hash
    pub password_hash: String,
    pub role: Role,
    pub disabled: bool,
    pub verified: bool,
    /// One-time verification token; empty once verified or unused
    pub verification_token: String,
    /// ISO 8601 creation timestamp
    pub created_at: String,
}

impl User {
    /// Projection persisted in the server-side session store.
    pub fn session_projection(&self) -> SessionUser {
        SessionUser {
            user_id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
            disabled: self.disabled,
            name: self.name.clone(),
        }
    }
}

/// Snapshot of a user held by a server-side session.
///
/// Authorization flags here are informational only: every auth check
/// re-derives them from the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub disabled: bool,
    pub name: String,
}

/// User fields safe to return to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientUser {
    pub name: String,
    pub email: String,
}

/// The full client-visible view: user plus filtered profile.
///
/// Never contains the password hash, verification token, or internal ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub user: ClientUser,
    pub profile: ClientProfile,
}

impl AccountView {
    pub fn new(user: &User, profile: &crate::models::profile::Profile) -> Self {
        Self {
            user: ClientUser {
                name: user.name.clone(),
                email: user.email.clone(),
            },
            profile: profile.client_view(),
        }
    }
}

/// Registration response record (no hash, no raw token).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}
