// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token issuance and verification.
//!
//! Access and refresh tokens are HS256 JWTs signed with separate keys, so a
//! refresh token can never pass as an access token even if the `typ` check
//! were skipped. One-time email tokens are random strings whose HMAC digest
//! is what gets stored.

use crate::config::Config;
use crate::error::AppError;
use crate::models::Role;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Which of the two session tokens a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub role: Role,
    pub typ: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    one_time_key: Vec<u8>,
    rng: SystemRandom,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(&config.access_token_key),
            access_decoding: DecodingKey::from_secret(&config.access_token_key),
            refresh_encoding: EncodingKey::from_secret(&config.refresh_token_key),
            refresh_decoding: DecodingKey::from_secret(&config.refresh_token_key),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            one_time_key: config.one_time_token_key.clone(),
            rng: SystemRandom::new(),
        }
    }

    /// Issue both session tokens for a user.
    pub fn issue_pair(&self, user_id: &str, role: Role) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id, role)?,
            refresh_token: self.sign(user_id, role, TokenType::Refresh)?,
        })
    }

    pub fn issue_access(&self, user_id: &str, role: Role) -> Result<String, AppError> {
        self.sign(user_id, role, TokenType::Access)
    }

    fn sign(&self, user_id: &str, role: Role, typ: TokenType) -> Result<String, AppError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs();
        let (ttl, key) = match typ {
            TokenType::Access => (self.access_ttl, &self.access_encoding),
            TokenType::Refresh => (self.refresh_ttl, &self.refresh_encoding),
        };

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            typ,
            iat: now,
            exp: now + ttl.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
    }

    /// Validate an access token. Any failure is `InvalidToken`.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, &self.access_decoding, TokenType::Access)
    }

    /// Validate a refresh token. Any failure is `InvalidToken`.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, &self.refresh_decoding, TokenType::Refresh)
    }

    fn verify(&self, token: &str, key: &DecodingKey, expected: TokenType) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            AppError::InvalidToken
        })?;
        if data.claims.typ != expected {
            tracing::debug!(typ = ?data.claims.typ, "Token of wrong type");
            return Err(AppError::InvalidToken);
        }
        Ok(data.claims)
    }

    /// Generate a one-time token for an email link.
    ///
    /// Returns `(token, digest)`: the token goes in the link, the digest in
    /// the database.
    pub fn generate_one_time(&self) -> Result<(String, String), AppError> {
        let mut bytes = [0u8; 32];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Random generation failed")))?;
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let digest = self.digest_one_time(&token)?;
        Ok((token, digest))
    }

    /// Digest of a presented one-time token, for lookup.
    pub fn digest_one_time(&self, token: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.one_time_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Random 128-bit hex identifier for new records.
    pub fn new_id(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; 16];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Random generation failed")))?;
        Ok(hex::encode(bytes))
    }
}
