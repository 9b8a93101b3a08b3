// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plateful: meal-planning backend API
//!
//! This crate provides the backend for the Plateful web client:
//! first-party and federated authentication, account lifecycle, and the
//! per-user meal-planning profile.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::{SessionStore, UserStore};
use services::{AccountService, SessionAuthority};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: UserStore,
    pub sessions: Arc<SessionStore>,
    pub authority: SessionAuthority,
    pub accounts: AccountService,
}
