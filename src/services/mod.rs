// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod account;
pub mod credentials;
pub mod identity;
pub mod mailer;
pub mod session;

pub use account::{AccountService, FederatedSignIn, RegisterRequest};
pub use identity::{IdentityVerifier, Provider, ARTIFACT_TTL};
pub use mailer::Mailer;
pub use session::{RefreshOutcome, SessionAuthority};
