// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Token signing keys are derived once at startup from `JWT_SECRET` and kept
//! in memory for the life of the process.

use hkdf::Hkdf;
use sha2::Sha256;
use std::env;
use std::time::Duration;

/// Deployment environment, toggles production behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Where user and donation records live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// Firestore in the given project (or the emulator, if `FIRESTORE_EMULATOR_HOST` is set).
    Firestore { project_id: String },
    /// Process-local store, lost on restart.
    Memory,
}

/// Outbound SMTP settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Email delivery settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP relay; `None` logs messages instead of sending them.
    pub smtp: Option<SmtpConfig>,
    /// `From:` header for every message.
    pub from: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    pub environment: Environment,
    /// Frontend URL for CORS and email links
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    pub database: DatabaseConfig,
    pub mail: MailConfig,
    /// Honor `X-Forwarded-For` when keying rate limits
    pub trust_proxy: bool,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,

    // --- Secrets ---
    /// HS256 key for access tokens
    pub access_token_key: Vec<u8>,
    /// HS256 key for refresh tokens
    pub refresh_token_key: Vec<u8>,
    /// HMAC key for digesting one-time email tokens before storage
    pub one_time_token_key: Vec<u8>,
}

const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const MIN_SECRET_LEN: usize = 32;

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        let keys = DerivedKeys::from_secret(b"test_jwt_secret_32_bytes_minimum!!");
        Self {
            environment: Environment::Test,
            frontend_url: "http://localhost:3000".to_string(),
            port: 5000,
            database: DatabaseConfig::Memory,
            mail: MailConfig {
                smtp: None,
                from: "FoodSave <noreply@foodsave.com>".to_string(),
            },
            trust_proxy: true,
            access_token_ttl: Duration::from_secs(DEFAULT_ACCESS_TTL_SECS),
            refresh_token_ttl: Duration::from_secs(DEFAULT_REFRESH_TTL_SECS),
            access_token_key: keys.access,
            refresh_token_key: keys.refresh,
            one_time_token_key: keys.one_time,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let environment = env::var("APP_ENV")
            .or_else(|_| env::var("NODE_ENV"))
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);

        let secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(
                "JWT_SECRET",
                format!("must be at least {} bytes", MIN_SECRET_LEN),
            ));
        }
        let mut keys = DerivedKeys::from_secret(secret.as_bytes());
        if let Some(refresh) = refresh_secret(env::var("JWT_REFRESH_SECRET").ok())? {
            keys.refresh = refresh;
        }

        let database = match env::var("DATABASE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => DatabaseConfig::Memory,
            "firestore" => DatabaseConfig::Firestore {
                project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            },
            other => {
                return Err(ConfigError::Invalid(
                    "DATABASE_BACKEND",
                    format!("unknown backend '{}'", other),
                ))
            }
        };

        let smtp = match env::var("EMAIL_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host: host.trim().to_string(),
                port: parse_var("EMAIL_PORT", 587)?,
                username: env::var("EMAIL_USER").ok(),
                password: env::var("EMAIL_PASSWORD").map(|v| v.trim().to_string()).ok(),
            }),
            _ => None,
        };

        Ok(Self {
            environment,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: parse_var("PORT", 5000)?,
            database,
            mail: MailConfig {
                smtp,
                from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "FoodSave <noreply@foodsave.com>".to_string()),
            },
            trust_proxy: parse_var("TRUST_PROXY", false)?,
            access_token_ttl: Duration::from_secs(parse_var(
                "ACCESS_TOKEN_TTL_SECS",
                DEFAULT_ACCESS_TTL_SECS,
            )?),
            refresh_token_ttl: Duration::from_secs(parse_var(
                "REFRESH_TOKEN_TTL_SECS",
                DEFAULT_REFRESH_TTL_SECS,
            )?),
            access_token_key: keys.access,
            refresh_token_key: keys.refresh,
            one_time_token_key: keys.one_time,
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, format!("cannot parse '{}'", raw))),
        Err(_) => Ok(default),
    }
}

/// An explicit refresh-token secret. Unset or blank means keep the derived key.
fn refresh_secret(raw: Option<String>) -> Result<Option<Vec<u8>>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Invalid(
            "JWT_REFRESH_SECRET",
            format!("must be at least {} bytes", MIN_SECRET_LEN),
        ));
    }
    Ok(Some(trimmed.as_bytes().to_vec()))
}

/// Per-purpose keys expanded from the master secret.
struct DerivedKeys {
    access: Vec<u8>,
    refresh: Vec<u8>,
    one_time: Vec<u8>,
}

impl DerivedKeys {
    fn from_secret(secret: &[u8]) -> Self {
        let hk = Hkdf::<Sha256>::new(None, secret);
        let expand = |info: &[u8]| {
            let mut okm = [0u8; 32];
            // 32 bytes is far below the HKDF-SHA256 output limit.
            hk.expand(info, &mut okm)
                .expect("32-byte HKDF output is always valid");
            okm.to_vec()
        };
        Self {
            access: expand(b"foodsave access"),
            refresh: expand(b"foodsave refresh"),
            one_time: expand(b"foodsave one-time"),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("JWT_SECRET", "test_jwt_secret_32_bytes_minimum!!");
        env::set_var("DATABASE_BACKEND", "memory");
        env::set_var("APP_ENV", "production");
        env::remove_var("EMAIL_HOST");
        env::remove_var("JWT_REFRESH_SECRET");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.database, DatabaseConfig::Memory);
        assert!(config.mail.smtp.is_none());
        assert_eq!(config.access_token_ttl, Duration::from_secs(900));
        assert_ne!(config.access_token_key, config.refresh_token_key);
        assert_ne!(config.access_token_key, config.one_time_token_key);

        // A bare `JWT_REFRESH_SECRET=` line keeps the derived refresh key
        let derived = config.refresh_token_key.clone();
        env::set_var("JWT_REFRESH_SECRET", "");
        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.refresh_token_key, derived);

        env::set_var("JWT_REFRESH_SECRET", "too short");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("JWT_REFRESH_SECRET", _))
        ));
        env::remove_var("JWT_REFRESH_SECRET");
    }

    #[test]
    fn test_refresh_secret_rejects_empty_and_short_values() {
        assert!(refresh_secret(None).unwrap().is_none());
        assert!(refresh_secret(Some(String::new())).unwrap().is_none());
        assert!(refresh_secret(Some("   \t".to_string())).unwrap().is_none());
        assert!(matches!(
            refresh_secret(Some("short".to_string())),
            Err(ConfigError::Invalid("JWT_REFRESH_SECRET", _))
        ));

        let secret = "refresh_secret_that_is_32_bytes!!";
        assert_eq!(
            refresh_secret(Some(format!("  {secret}\n"))).unwrap(),
            Some(secret.as_bytes().to_vec())
        );
    }

    #[test]
    fn test_derived_keys_are_deterministic() {
        let a = DerivedKeys::from_secret(b"same secret");
        let b = DerivedKeys::from_secret(b"same secret");
        assert_eq!(a.access, b.access);
        assert_eq!(a.refresh, b.refresh);
        assert_eq!(a.access.len(), 32);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("Production"), Environment::Production);
        assert_eq!(Environment::parse("test"), Environment::Test);
        assert_eq!(Environment::parse("anything"), Environment::Development);
    }
}
