// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL for CORS and verification links
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// HS256 signing key for federated session artifacts (raw bytes)
    pub artifact_signing_key: Vec<u8>,
    /// Expected audience for Google id-tokens
    pub google_client_id: String,
    /// Expected audience for Facebook Limited Login id-tokens
    pub facebook_app_id: String,

    // --- Mail ---
    /// SMTP relay host; when unset, outbound mail is logged instead of sent
    pub smtp_relay: Option<String>,
    pub smtp_username: String,
    pub smtp_password: String,
    /// From address for transactional mail
    pub mail_from: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            artifact_signing_key: b"test_artifact_key_32_bytes_min!!".to_vec(),
            google_client_id: "test-google-client".to_string(),
            facebook_app_id: "test-facebook-app".to_string(),
            smtp_relay: None,
            smtp_username: String::new(),
            smtp_password: String::new(),
            mail_from: "Plateful <no-reply@plateful.app>".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// For local development, secrets can be set via a `.env` file.
    /// In production, Cloud Run injects secrets as environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            artifact_signing_key: env::var("ARTIFACT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("ARTIFACT_SIGNING_KEY"))?
                .into_bytes(),
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            facebook_app_id: env::var("FACEBOOK_APP_ID")
                .map_err(|_| ConfigError::Missing("FACEBOOK_APP_ID"))?,

            smtp_relay: env::var("SMTP_RELAY").ok().filter(|v| !v.trim().is_empty()),
            smtp_username: env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Plateful <no-reply@plateful.app>".to_string()),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
