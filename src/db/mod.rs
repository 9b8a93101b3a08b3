// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer: credential/profile store and the session store.

pub mod sessions;
pub mod store;

pub use sessions::SessionStore;
pub use store::UserStore;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PROFILES: &str = "profiles";
    /// Uniqueness guard: one document per registered email, keyed by the
    /// email itself so the insert precondition enforces global uniqueness.
    pub const EMAIL_INDEX: &str = "email_index";
}
