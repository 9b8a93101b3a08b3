// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account Lifecycle Manager: registration, email verification, and the
//! first-login-vs-returning-user branching for federated sign-in.

use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::models::{AccountView, Profile, RegisteredUser, Role, User};
use crate::services::credentials;
use crate::services::identity::{IdentityVerifier, Provider};
use crate::services::mailer::Mailer;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Registration request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Please enter your name"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[validate(length(min = 10, message = "Password must be at least 10 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords must match"))]
    pub confirm_password: String,
}

/// Result of a federated sign-in.
pub struct FederatedSignIn {
    /// True when this call created the account (first sign-in).
    pub created: bool,
    pub view: AccountView,
}

#[derive(Clone)]
pub struct AccountService {
    store: UserStore,
    identity: Arc<IdentityVerifier>,
    mailer: Mailer,
    frontend_url: String,
}

impl AccountService {
    pub fn new(
        store: UserStore,
        identity: Arc<IdentityVerifier>,
        mailer: Mailer,
        frontend_url: String,
    ) -> Self {
        Self {
            store,
            identity,
            mailer,
            frontend_url,
        }
    }

    /// Register a first-party account. The store enforces email
    /// uniqueness; there is deliberately no pre-check (no check-then-act
    /// race).
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisteredUser> {
        request.validate()?;

        let verification_token = credentials::generate_token();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: request.email.clone(),
            name: request.name.clone(),
            password_hash: credentials::hash_password(&request.password)?,
            role: Role::Basic,
            disabled: false,
            verified: false,
            verification_token: verification_token.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let profile = Profile::empty(&user.id);

        self.store.create_user_with_profile(&user, &profile).await?;
        tracing::info!(user_id = %user.id, "User registered");

        self.send_verification_email(&user.email, &verification_token);

        Ok(RegisteredUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        })
    }

    /// Consume a verification token. One-time use: the token is cleared on
    /// success, and a consumed or unknown token fails identically.
    pub async fn verify_email(&self, key: &str) -> Result<()> {
        let Some(mut user) = self.store.find_user_by_verification_token(key).await? else {
            return Err(AppError::Unauthorized);
        };

        user.verified = true;
        user.verification_token = String::new();
        self.store.update_user(&user).await?;
        tracing::info!(user_id = %user.id, "Email verified");
        Ok(())
    }

    /// Re-send a verification email. Always success-shaped so the response
    /// never signals whether the account exists.
    pub async fn re_verify_email(&self, email: &str) -> Result<()> {
        let Some(mut user) = self.store.find_user_by_email(email).await? else {
            return Ok(());
        };
        if user.verified {
            return Ok(());
        }

        // Rotation invalidates any previously mailed link.
        let verification_token = credentials::generate_token();
        user.verification_token = verification_token.clone();
        self.store.update_user(&user).await?;

        self.send_verification_email(&user.email, &verification_token);
        Ok(())
    }

    /// Verify a provider id-token and mint the session artifact for the
    /// email it proves. The artifact's validity is independent of local
    /// account state, so no store access happens here.
    pub async fn verify_federated(
        &self,
        provider: Provider,
        id_token: &str,
    ) -> Result<(String, String)> {
        let email = self.identity.verify_id_token(provider, id_token).await?;
        let artifact = self.identity.mint_artifact(&email)?;
        Ok((email, artifact))
    }

    /// Federated sign-in for a provider-verified email: create-or-fetch
    /// the local account.
    pub async fn federated_sign_in(
        &self,
        provider: Provider,
        email: &str,
    ) -> Result<FederatedSignIn> {
        let (mut user, created) = match self.store.find_user_by_email(email).await? {
            Some(user) => (user, false),
            None => self.create_or_fetch(provider, email).await?,
        };

        // Self-healing: provider proof verifies the email even for
        // accounts that originally registered by password.
        if !user.verified {
            user.verified = true;
            user.verification_token = String::new();
            self.store.update_user(&user).await?;
        }

        let view = self
            .store
            .find_profile(&user.id)
            .await?
            .map(|profile| AccountView::new(&user, &profile))
            .ok_or_else(|| sign_in_failed(provider))?;

        tracing::info!(
            user_id = %user.id,
            provider = provider.as_str(),
            created,
            "Federated sign-in"
        );

        Ok(FederatedSignIn { created, view })
    }

    /// Create the account for a first federated sign-in. Losing a
    /// concurrent creation race (the store's uniqueness conflict) is
    /// retried as a lookup: the other request created the account.
    async fn create_or_fetch(&self, provider: Provider, email: &str) -> Result<(User, bool)> {
        match self.create_federated_user(email).await {
            Ok(user) => Ok((user, true)),
            Err(AppError::Conflict(_)) => {
                let user = self
                    .store
                    .find_user_by_email(email)
                    .await?
                    .ok_or_else(|| sign_in_failed(provider))?;
                Ok((user, false))
            }
            Err(other) => Err(other),
        }
    }

    async fn create_federated_user(&self, email: &str) -> Result<User> {
        // The provider supplies no verified display name in this flow, so
        // the email doubles as the name. The throwaway hash can never
        // match a password login.
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: email.to_string(),
            password_hash: credentials::hash_password(&credentials::throwaway_password())?,
            role: Role::Basic,
            disabled: false,
            verified: true,
            verification_token: String::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        self.store
            .create_user_with_profile(&user, &Profile::empty(&user.id))
            .await?;
        Ok(user)
    }

    fn send_verification_email(&self, to: &str, token: &str) {
        let link = format!(
            "{}/verify-email?key={}",
            self.frontend_url,
            urlencoding::encode(token)
        );
        self.mailer.send(
            to,
            "[No reply] Please verify your Plateful email",
            &format!("Please verify your Plateful email by clicking the link below:\n\n{link}"),
        );
    }
}

fn sign_in_failed(provider: Provider) -> AppError {
    AppError::BadRequest(format!("Error during {} sign-in", provider.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_register_request_validation_tags_fields() {
        let err = request("", "not-an-email", "short", "different")
            .validate()
            .unwrap_err();
        let fields = err.field_errors();
        assert!(fields.keys().any(|k| k.as_ref() == "name"));
        assert!(fields.keys().any(|k| k.as_ref() == "email"));
        assert!(fields.keys().any(|k| k.as_ref() == "password"));
        assert!(fields.keys().any(|k| k.as_ref() == "confirm_password"));
    }

    #[test]
    fn test_register_request_accepts_valid_input() {
        assert!(request("A", "a@x.com", "longenough1", "longenough1")
            .validate()
            .is_ok());
    }

    mod federated {
        use super::super::*;
        use crate::config::Config;
        use crate::models::Role;
        use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
        use std::time::{SystemTime, UNIX_EPOCH};

        const TEST_KID: &str = "test-key";
        const TEST_SECRET: &[u8] = b"static-test-secret";

        fn service() -> (AccountService, UserStore) {
            let store = UserStore::new_memory();
            let identity = Arc::new(
                IdentityVerifier::new_with_static_key(
                    &Config::default(),
                    TEST_KID,
                    DecodingKey::from_secret(TEST_SECRET),
                    Algorithm::HS256,
                )
                .unwrap(),
            );
            let accounts = AccountService::new(
                store.clone(),
                identity,
                Mailer::new_mock(),
                "http://localhost:5173".to_string(),
            );
            (accounts, store)
        }

        fn mint_id_token(email: &str) -> String {
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
            encode(&header, &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
        }

        async fn seed(store: &UserStore, email: &str) -> User {
            let user = User {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                name: email.to_string(),
                password_hash: "$argon2id$seed".to_string(),
                role: Role::Basic,
                disabled: false,
                verified: true,
                verification_token: String::new(),
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            store
                .create_user_with_profile(&user, &Profile::empty(&user.id))
                .await
                .unwrap();
            user
        }

        #[tokio::test]
        async fn test_verify_federated_touches_no_account_state() {
            let (accounts, store) = service();
            let token = mint_id_token("new@x.com");

            let (email, artifact) = accounts
                .verify_federated(Provider::Google, &token)
                .await
                .unwrap();
            assert_eq!(email, "new@x.com");
            assert!(!artifact.is_empty());

            // The artifact exists before (and independent of) any account.
            assert!(store.find_user_by_email("new@x.com").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_lost_creation_race_resolves_to_existing_account() {
            let (accounts, store) = service();
            // Another request already created the account for this email,
            // so the creation path hits the uniqueness conflict.
            let existing = seed(&store, "raced@x.com").await;

            let (user, created) = accounts
                .create_or_fetch(Provider::Google, "raced@x.com")
                .await
                .unwrap();
            assert!(!created);
            assert_eq!(user.id, existing.id);
        }
    }
}
