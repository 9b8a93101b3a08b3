// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plateful API Server
//!
//! Serves authentication, account lifecycle, and profile data for the
//! Plateful meal-planning web client.

use plateful_api::{
    config::Config,
    db::{sessions::DEFAULT_SESSION_TTL, SessionStore, UserStore},
    services::{AccountService, IdentityVerifier, Mailer, SessionAuthority},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Plateful API");

    // Initialize the credential store
    let store = UserStore::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Server-side session store (idle TTL)
    let sessions = Arc::new(SessionStore::new(DEFAULT_SESSION_TTL));

    // Federated identity verification + session artifacts
    let identity =
        Arc::new(IdentityVerifier::new(&config).expect("Failed to initialize identity verifier"));

    // Transactional mail (log-only without SMTP_RELAY)
    let mailer = Mailer::from_config(&config).expect("Failed to initialize mailer");

    let authority = SessionAuthority::new(store.clone(), sessions.clone(), identity.clone());
    let accounts = AccountService::new(
        store.clone(),
        identity,
        mailer,
        config.frontend_url.clone(),
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        sessions,
        authority,
        accounts,
    });

    // Build router
    let app = plateful_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("plateful_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
