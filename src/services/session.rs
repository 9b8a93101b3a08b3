// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session Authority: who is making this request, and may they proceed?
//!
//! Two session representations exist side by side: first-party sessions in
//! the server-side store, and federated session artifacts delivered as a
//! separate cookie. Auth checks walk an ordered strategy list in which the
//! artifact always wins over the server-side session.
//!
//! Authorization state is re-derived from the credential store on every
//! check rather than trusted from cookie or session contents, so a
//! disabled or deleted account loses access on its very next request.

use crate::db::{SessionStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::{AccountView, User};
use crate::services::credentials;
use crate::services::identity::IdentityVerifier;
use std::sync::Arc;

/// Outcome of evaluating one credential source.
enum Resolution {
    /// Source applied and authenticated the request.
    Found(AccountView),
    /// Source not presented; try the next one.
    NotApplicable,
    /// Source presented but failed; terminal, later sources are not tried.
    Invalid,
}

/// Result of a refresh call.
pub enum RefreshOutcome {
    /// Federated branch: fresh view; the artifact itself is not re-minted
    /// and keeps its original 5-day expiry.
    Federated(AccountView),
    /// First-party branch: the session's idle window was extended.
    Extended,
}

/// Owns establishing, validating, refreshing, and destroying
/// authenticated state.
#[derive(Clone)]
pub struct SessionAuthority {
    store: UserStore,
    sessions: Arc<SessionStore>,
    identity: Arc<IdentityVerifier>,
}

impl SessionAuthority {
    pub fn new(
        store: UserStore,
        sessions: Arc<SessionStore>,
        identity: Arc<IdentityVerifier>,
    ) -> Self {
        Self {
            store,
            sessions,
            identity,
        }
    }

    /// First-party login. Any previous session is torn down before the
    /// credentials are even examined, so no failure path leaves one behind.
    pub async fn login(
        &self,
        previous_session: Option<&str>,
        email: &str,
        password: &str,
    ) -> Result<(String, AccountView)> {
        if let Some(id) = previous_session {
            self.sessions.destroy(id);
        }

        let Some(user) = self.store.find_user_by_email(email).await? else {
            return Err(AppError::InvalidCredentials);
        };
        if !credentials::verify_password(password, &user.password_hash) {
            return Err(AppError::InvalidCredentials);
        }
        if user.disabled {
            return Err(AppError::AccountDisabled);
        }
        if !user.verified {
            return Err(AppError::NotVerified);
        }

        let Some(view) = self.account_view(&user).await? else {
            // No profile means the record pair is corrupt; treat like a
            // failed login rather than leaking internals.
            return Err(AppError::InvalidCredentials);
        };

        let session_id = self.sessions.create(user.session_projection());
        tracing::info!(user_id = %user.id, "First-party session established");
        Ok((session_id, view))
    }

    /// Destroy the server-side session, if any. Idempotent.
    pub fn logout(&self, session_id: Option<&str>) {
        if let Some(id) = session_id {
            self.sessions.destroy(id);
            tracing::debug!("Server-side session destroyed");
        }
    }

    /// Resolve the current user. Strategy order: federated artifact first,
    /// then server-side session.
    pub async fn auth_check(
        &self,
        artifact: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<AccountView> {
        match self.resolve_artifact(artifact).await? {
            Resolution::Found(view) => return Ok(view),
            Resolution::Invalid => return Err(AppError::Unauthorized),
            Resolution::NotApplicable => {}
        }

        match self.resolve_session(session_id).await? {
            Resolution::Found(view) => return Ok(view),
            Resolution::Invalid => return Err(AppError::Unauthorized),
            Resolution::NotApplicable => {}
        }

        // No credential source applied; clear any stray session.
        self.logout(session_id);
        Err(AppError::Unauthorized)
    }

    /// Refresh authenticated state. The federated branch matches
    /// `auth_check`; the first-party branch confirms the user still exists
    /// and extends the session's idle window.
    pub async fn refresh(
        &self,
        artifact: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<RefreshOutcome> {
        match self.resolve_artifact(artifact).await? {
            Resolution::Found(view) => return Ok(RefreshOutcome::Federated(view)),
            Resolution::Invalid => return Err(AppError::Unauthorized),
            Resolution::NotApplicable => {}
        }

        let Some(id) = session_id else {
            return Err(AppError::Unauthorized);
        };
        let Some(session) = self.sessions.get(id) else {
            return Err(AppError::Unauthorized);
        };

        // Guards against a user deleted (or disabled) mid-session.
        match self.store.find_user_by_id(&session.user_id).await? {
            Some(user) if !user.disabled => {
                self.sessions.touch(id);
                Ok(RefreshOutcome::Extended)
            }
            _ => {
                self.sessions.destroy(id);
                Err(AppError::Unauthorized)
            }
        }
    }

    // ─── Credential Sources ──────────────────────────────────────

    async fn resolve_artifact(&self, artifact: Option<&str>) -> Result<Resolution> {
        let Some(artifact) = artifact else {
            return Ok(Resolution::NotApplicable);
        };

        let Ok(email) = self.identity.validate_artifact(artifact) else {
            return Ok(Resolution::Invalid);
        };

        // The artifact proves email ownership at issuance time only; the
        // view is always built from the current store records.
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            return Ok(Resolution::Invalid);
        };
        if user.disabled {
            return Ok(Resolution::Invalid);
        }

        match self.account_view(&user).await? {
            Some(view) => Ok(Resolution::Found(view)),
            None => Ok(Resolution::Invalid),
        }
    }

    async fn resolve_session(&self, session_id: Option<&str>) -> Result<Resolution> {
        let Some(id) = session_id else {
            return Ok(Resolution::NotApplicable);
        };
        let Some(session) = self.sessions.get(id) else {
            return Ok(Resolution::NotApplicable);
        };

        let Some(user) = self.store.find_user_by_email(&session.email).await? else {
            self.sessions.destroy(id);
            return Ok(Resolution::Invalid);
        };
        if user.disabled {
            self.sessions.destroy(id);
            return Ok(Resolution::Invalid);
        }

        match self.account_view(&user).await? {
            Some(view) => Ok(Resolution::Found(view)),
            None => {
                self.sessions.destroy(id);
                Ok(Resolution::Invalid)
            }
        }
    }

    async fn account_view(&self, user: &User) -> Result<Option<AccountView>> {
        Ok(self
            .store
            .find_profile(&user.id)
            .await?
            .map(|profile| AccountView::new(user, &profile)))
    }
}
