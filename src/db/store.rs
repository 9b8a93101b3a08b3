// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store with typed operations.
//!
//! Provides high-level operations for:
//! - Users (identity records, looked up by id, email, or verification token)
//! - Profiles (one per user, created atomically with the user)
//!
//! Backed by Firestore in production. The in-memory backend exists for
//! tests and emulator-free local development; it enforces the same email
//! uniqueness constraint as the Firestore email index.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Profile, User};
use dashmap::DashMap;
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Email index document: maps a registered email to its user id.
#[derive(Debug, Serialize, Deserialize)]
struct EmailIndexEntry {
    user_id: String,
}

#[derive(Default)]
struct Memory {
    users: DashMap<String, User>,
    profiles: DashMap<String, Profile>,
    emails: DashMap<String, String>,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<Memory>),
}

/// Credential store client.
#[derive(Clone)]
pub struct UserStore {
    backend: Backend,
}

impl UserStore {
    /// Create a new Firestore-backed store.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-memory store (tests, emulator-free local dev).
    pub fn new_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Memory::default())),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document id.
    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Memory(mem) => Ok(mem.users.get(id).map(|u| u.clone())),
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
        }
    }

    /// Get a user by email, via the email index.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Memory(mem) => {
                let Some(id) = mem.emails.get(email).map(|id| id.clone()) else {
                    return Ok(None);
                };
                Ok(mem.users.get(&id).map(|u| u.clone()))
            }
            Backend::Firestore(client) => {
                let entry: Option<EmailIndexEntry> = client
                    .fluent()
                    .select()
                    .by_id_in(collections::EMAIL_INDEX)
                    .obj()
                    .one(email)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                match entry {
                    Some(entry) => self.find_user_by_id(&entry.user_id).await,
                    None => Ok(None),
                }
            }
        }
    }

    /// Get a user by verification token.
    ///
    /// A cleared token is the empty string; an empty key must never match.
    pub async fn find_user_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, AppError> {
        if token.is_empty() {
            return Ok(None);
        }

        match &self.backend {
            Backend::Memory(mem) => Ok(mem
                .users
                .iter()
                .find(|u| u.verification_token == token)
                .map(|u| u.clone())),
            Backend::Firestore(client) => {
                let token = token.to_string();
                let users: Vec<User> = client
                    .fluent()
                    .select()
                    .from(collections::USERS)
                    .filter(move |q| q.field("verification_token").eq(token.clone()))
                    .limit(1)
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(users.into_iter().next())
            }
        }
    }

    /// Create a user together with its empty profile.
    ///
    /// Email uniqueness is enforced by the store itself (index insert
    /// precondition), not pre-checked by callers; a duplicate maps to
    /// `AppError::Conflict`.
    pub async fn create_user_with_profile(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(mem) => {
                use dashmap::mapref::entry::Entry;
                match mem.emails.entry(user.email.clone()) {
                    Entry::Occupied(_) => {
                        return Err(AppError::Conflict("email already registered".to_string()))
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(user.id.clone());
                    }
                }
                mem.users.insert(user.id.clone(), user.clone());
                mem.profiles.insert(user.id.clone(), profile.clone());
                Ok(())
            }
            Backend::Firestore(client) => {
                // The index insert is the uniqueness gate; the user and
                // profile writes only happen once it succeeds.
                let index = EmailIndexEntry {
                    user_id: user.id.clone(),
                };
                let _: EmailIndexEntry = client
                    .fluent()
                    .insert()
                    .into(collections::EMAIL_INDEX)
                    .document_id(&user.email)
                    .object(&index)
                    .execute()
                    .await
                    .map_err(|e| match e {
                        FirestoreError::DataConflictError(_) => {
                            AppError::Conflict("email already registered".to_string())
                        }
                        other => AppError::Database(other.to_string()),
                    })?;

                // User and profile commit as one transaction. A failure
                // here must also roll back the index entry, or the email
                // would be unregistrable forever.
                let written: Result<(), AppError> = async {
                    let mut transaction = client.begin_transaction().await.map_err(|e| {
                        AppError::Database(format!("Failed to begin transaction: {}", e))
                    })?;

                    client
                        .fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user.id)
                        .object(user)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| {
                            AppError::Database(format!("Failed to add user to transaction: {}", e))
                        })?;

                    client
                        .fluent()
                        .update()
                        .in_col(collections::PROFILES)
                        .document_id(&user.id)
                        .object(profile)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| {
                            AppError::Database(format!(
                                "Failed to add profile to transaction: {}",
                                e
                            ))
                        })?;

                    transaction.commit().await.map_err(|e| {
                        AppError::Database(format!("Transaction commit failed: {}", e))
                    })?;
                    Ok(())
                }
                .await;

                if let Err(err) = written {
                    if let Err(cleanup) = client
                        .fluent()
                        .delete()
                        .from(collections::EMAIL_INDEX)
                        .document_id(&user.email)
                        .execute()
                        .await
                    {
                        tracing::error!(email = %user.email, error = %cleanup,
                            "Failed to roll back email index entry");
                    }
                    return Err(err);
                }

                Ok(())
            }
        }
    }

    /// Update an existing user record. The email never changes.
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(mem) => {
                mem.users.insert(user.id.clone(), user.clone());
                Ok(())
            }
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .document_id(&user.id)
                    .object(user)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
        }
    }

    /// Delete a user, its profile, and its email index entry. The email
    /// becomes registrable again.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(mem) => {
                if let Some((_, user)) = mem.users.remove(id) {
                    mem.emails.remove(&user.email);
                }
                mem.profiles.remove(id);
                Ok(())
            }
            Backend::Firestore(client) => {
                let user = self.find_user_by_id(id).await?;

                client
                    .fluent()
                    .delete()
                    .from(collections::USERS)
                    .document_id(id)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                client
                    .fluent()
                    .delete()
                    .from(collections::PROFILES)
                    .document_id(id)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                if let Some(user) = user {
                    client
                        .fluent()
                        .delete()
                        .from(collections::EMAIL_INDEX)
                        .document_id(&user.email)
                        .execute()
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;
                }

                Ok(())
            }
        }
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get the profile belonging to a user.
    pub async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        match &self.backend {
            Backend::Memory(mem) => Ok(mem.profiles.get(user_id).map(|p| p.clone())),
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::PROFILES)
                .obj()
                .one(user_id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
        }
    }
}
