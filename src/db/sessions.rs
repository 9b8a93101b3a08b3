// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side session store.
//!
//! In-process key-value store with an idle TTL, keyed by an opaque
//! cookie-delivered id. All mutation goes through explicit
//! create/get/touch/destroy calls; expired entries are reaped lazily
//! on access.

use crate::models::SessionUser;
use crate::services::credentials;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Default idle timeout for first-party sessions.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    user: SessionUser,
    expires_at: Instant,
}

/// TTL-bound store for first-party sessions.
pub struct SessionStore {
    entries: DashMap<String, SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Create a session for a user projection and return its opaque id.
    pub fn create(&self, user: SessionUser) -> String {
        let id = credentials::generate_session_id();
        self.entries.insert(
            id.clone(),
            SessionEntry {
                user,
                expires_at: Instant::now() + self.ttl,
            },
        );
        id
    }

    /// Look up a live session. Expired entries are removed and not returned.
    pub fn get(&self, id: &str) -> Option<SessionUser> {
        let expired = match self.entries.get(id) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.user.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(id);
        }
        None
    }

    /// Extend a live session's idle window. Returns false if the session
    /// does not exist or has already expired.
    pub fn touch(&self, id: &str) -> bool {
        match self.entries.get_mut(id) {
            Some(mut entry) if entry.expires_at > Instant::now() => {
                entry.expires_at = Instant::now() + self.ttl;
                true
            }
            _ => false,
        }
    }

    /// Destroy a session. Destroying a missing session is not an error.
    pub fn destroy(&self, id: &str) {
        self.entries.remove(id);
    }

    /// Number of live entries (expired-but-unreaped entries included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
