// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Federated identity verification and session artifacts.
//!
//! Two concerns live here:
//! - verifying provider-issued id-tokens (Google / Facebook Limited Login)
//!   against the provider's published JWKS, with in-memory key caching
//! - minting and validating the signed session artifact that a successful
//!   federated sign-in materializes as a cookie
//!
//! The artifact only proves "this email was verified by the provider at
//! issuance time"; account standing is re-derived from the credential
//! store on every use.

use crate::config::Config;
use crate::error::AppError;
use anyhow::Context;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const FACEBOOK_JWKS_URL: &str = "https://www.facebook.com/.well-known/oauth/openid/jwks/";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const JWKS_CACHE_TTL: Duration = Duration::from_secs(300);

/// Fixed validity of a federated session artifact.
pub const ARTIFACT_TTL: Duration = Duration::from_secs(5 * 24 * 60 * 60);

/// Supported federated identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    Facebook,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }

    fn jwks_url(&self) -> &'static str {
        match self {
            Provider::Google => GOOGLE_JWKS_URL,
            Provider::Facebook => FACEBOOK_JWKS_URL,
        }
    }

    fn issuers(&self) -> &'static [&'static str] {
        match self {
            Provider::Google => &["https://accounts.google.com", "accounts.google.com"],
            Provider::Facebook => &["https://www.facebook.com"],
        }
    }
}

/// Claims we extract from a provider id-token.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    email: Option<String>,
}

/// Claims carried by a session artifact.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactClaims {
    /// Subject (verified email address)
    sub: String,
    iat: usize,
    exp: usize,
}

#[derive(Clone)]
enum VerifierMode {
    /// Fetch and cache provider JWKS keys (RS256).
    Remote,
    /// Single pinned key, for deterministic tests.
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
        algorithm: Algorithm,
    },
}

struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for provider id-tokens, and mint for session artifacts.
pub struct IdentityVerifier {
    http_client: reqwest::Client,
    google_audience: String,
    facebook_audience: String,
    artifact_encoding_key: EncodingKey,
    artifact_decoding_key: DecodingKey,
    mode: VerifierMode,
    jwks_cache: RwLock<HashMap<Provider, JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl IdentityVerifier {
    /// Create a production verifier that discovers and caches provider keys.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::build(config, VerifierMode::Remote)
    }

    /// Create a verifier with a single pinned key.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
        algorithm: Algorithm,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static identity kid must not be empty");
        }
        Self::build(
            config,
            VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
                algorithm,
            },
        )
    }

    fn build(config: &Config, mode: VerifierMode) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building identity HTTP client")?;

        Ok(Self {
            http_client,
            google_audience: config.google_client_id.clone(),
            facebook_audience: config.facebook_app_id.clone(),
            artifact_encoding_key: EncodingKey::from_secret(&config.artifact_signing_key),
            artifact_decoding_key: DecodingKey::from_secret(&config.artifact_signing_key),
            mode,
            jwks_cache: RwLock::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        })
    }

    fn audience(&self, provider: Provider) -> &str {
        match provider {
            Provider::Google => &self.google_audience,
            Provider::Facebook => &self.facebook_audience,
        }
    }

    // ─── Id-Token Verification ───────────────────────────────────

    /// Verify a provider id-token and return the verified email address.
    pub async fn verify_id_token(
        &self,
        provider: Provider,
        token: &str,
    ) -> Result<String, AppError> {
        let header = decode_header(token).map_err(|_| AppError::InvalidToken)?;
        let kid = header.kid.ok_or(AppError::InvalidToken)?;

        let (key, algorithm) = self.decoding_key_for(provider, &kid).await?;

        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[self.audience(provider)]);
        validation.set_issuer(provider.issuers());

        let data = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(|_| AppError::InvalidToken)?;

        data.claims
            .email
            .filter(|email| !email.is_empty())
            .ok_or(AppError::InvalidToken)
    }

    async fn decoding_key_for(
        &self,
        provider: Provider,
        kid: &str,
    ) -> Result<(Arc<DecodingKey>, Algorithm), AppError> {
        match &self.mode {
            VerifierMode::StaticKey {
                kid: expected,
                decoding_key,
                algorithm,
            } => {
                if kid == expected {
                    Ok((decoding_key.clone(), *algorithm))
                } else {
                    Err(AppError::InvalidToken)
                }
            }
            VerifierMode::Remote => {
                if let Some(key) = self.cached_key(provider, kid).await {
                    return Ok((key, Algorithm::RS256));
                }

                // Single-flight refresh: concurrent misses fetch once.
                let _guard = self.refresh_lock.lock().await;
                if let Some(key) = self.cached_key(provider, kid).await {
                    return Ok((key, Algorithm::RS256));
                }

                let keys = self.fetch_jwks(provider).await?;
                let key = keys.get(kid).cloned();
                self.jwks_cache.write().await.insert(
                    provider,
                    JwksCacheEntry {
                        keys_by_kid: keys,
                        expires_at: Instant::now() + JWKS_CACHE_TTL,
                    },
                );

                key.map(|k| (k, Algorithm::RS256))
                    .ok_or(AppError::InvalidToken)
            }
        }
    }

    async fn cached_key(&self, provider: Provider, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let entry = cache.get(&provider)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        entry.keys_by_kid.get(kid).cloned()
    }

    async fn fetch_jwks(
        &self,
        provider: Provider,
    ) -> Result<HashMap<String, Arc<DecodingKey>>, AppError> {
        #[derive(Deserialize)]
        struct Jwk {
            kty: String,
            kid: String,
            n: String,
            e: String,
        }
        #[derive(Deserialize)]
        struct JwkSet {
            keys: Vec<Jwk>,
        }

        let set: JwkSet = self
            .http_client
            .get(provider.jwks_url())
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("JWKS fetch failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Upstream(format!("JWKS fetch failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("JWKS parse failed: {}", e)))?;

        let mut keys = HashMap::new();
        for jwk in set.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(provider = provider.as_str(), kid = %jwk.kid, error = %e,
                        "Skipping unusable JWKS key");
                }
            }
        }

        if keys.is_empty() {
            return Err(AppError::Upstream(format!(
                "no usable keys in {} JWKS",
                provider.as_str()
            )));
        }
        Ok(keys)
    }

    // ─── Session Artifacts ───────────────────────────────────────

    /// Mint a federated session artifact for a verified email.
    pub fn mint_artifact(&self, email: &str) -> Result<String, AppError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs() as usize;

        let claims = ArtifactClaims {
            sub: email.to_string(),
            iat: now,
            exp: now + ARTIFACT_TTL.as_secs() as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.artifact_encoding_key,
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Artifact creation failed: {}", e)))
    }

    /// Validate a session artifact and recover the email it was minted for.
    ///
    /// Expired and malformed artifacts are indistinguishable to callers:
    /// both are a single `Unauthorized` outcome.
    pub fn validate_artifact(&self, artifact: &str) -> Result<String, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<ArtifactClaims>(artifact, &self.artifact_decoding_key, &validation)
            .map(|data| data.claims.sub)
            .map_err(|_| AppError::Unauthorized)
    }
}
