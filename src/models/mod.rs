// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod profile;
pub mod user;

pub use profile::{ClientProfile, Profile};
pub use user::{AccountView, ClientUser, RegisteredUser, Role, SessionUser, User};
