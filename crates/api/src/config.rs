//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TANAM_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `TANAM_API_KEY` - Shared key clients send in `X-API-Key` (high entropy)
//! - `TANAM_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `TANAM_PUBLIC_BASE_URL` - Public URL used in product image links
//!
//! ## Optional
//! - `TANAM_HOST` - Bind address (default: 127.0.0.1)
//! - `TANAM_PORT` - Listen port (default: 8081)
//! - `TANAM_REDIS_URL` - Key-value store URL (default: `memory://`, in-process)
//! - `TANAM_UPLOAD_DIR` - Image upload directory (default: uploads)
//! - `TANAM_OTP_WEBHOOK_URL` - Verification code mail webhook
//! - `TANAM_RESET_WEBHOOK_URL` - Password reset mail webhook
//! - `TANAM_RESET_PAGE_URL` - Password reset page (default: <https://www.tanam.software/reset/resetpassword.php>)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::kv::MEMORY_URL;
use crate::services::notify::NotifierConfig;

const MIN_SIGNING_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_RESET_PAGE: &str = "https://www.tanam.software/reset/resetpassword.php";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, prefixed to stored image links
    pub public_base_url: Url,
    /// Key expected in the `X-API-Key` header
    pub api_key: SecretString,
    /// JWT signing secret
    pub jwt_secret: SecretString,
    /// Key-value store URL (may contain a password)
    pub redis_url: SecretString,
    /// Directory product images are written to
    pub upload_dir: PathBuf,
    /// Notification webhooks
    pub notifier: NotifierConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("TANAM_DATABASE_URL")?;
        let host = get_env_or_default("TANAM_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TANAM_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("TANAM_PORT", "8081")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("TANAM_PORT".to_string(), e.to_string()))?;
        let public_base_url = parse_url(
            "TANAM_PUBLIC_BASE_URL",
            &get_required_env("TANAM_PUBLIC_BASE_URL")?,
        )?;

        let api_key = get_validated_secret("TANAM_API_KEY")?;
        let jwt_secret = get_validated_secret("TANAM_JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "TANAM_JWT_SECRET")?;

        let redis_url = SecretString::from(get_env_or_default("TANAM_REDIS_URL", MEMORY_URL));
        let upload_dir = PathBuf::from(get_env_or_default("TANAM_UPLOAD_DIR", "uploads"));

        let notifier = NotifierConfig {
            otp_webhook: get_optional_url("TANAM_OTP_WEBHOOK_URL")?,
            reset_webhook: get_optional_url("TANAM_RESET_WEBHOOK_URL")?,
            reset_page: parse_url(
                "TANAM_RESET_PAGE_URL",
                &get_env_or_default("TANAM_RESET_PAGE_URL", DEFAULT_RESET_PAGE),
            )?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            public_base_url,
            api_key,
            jwt_secret,
            redis_url,
            upload_dir,
            notifier,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first (e.g., TANAM_DATABASE_URL)
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    // Fallback to generic DATABASE_URL (set by Fly.io postgres attach)
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SIGNING_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SIGNING_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Parse a URL-valued variable.
fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an optional URL-valued variable.
fn get_optional_url(key: &str) -> Result<Option<Url>, ConfigError> {
    get_optional_env(key)
        .map(|value| parse_url(key, &value))
        .transpose()
}
