//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CTP_PROJECT_KEY` - Commerce platform project key
//! - `CTP_CLIENT_ID` - OAuth client ID
//! - `CTP_CLIENT_SECRET` - OAuth client secret
//! - `CTP_AUTH_URL` - OAuth token endpoint base URL
//! - `CTP_API_URL` - Commerce API base URL
//! - `CTP_SCOPES` - Space-separated OAuth scopes
//!
//! ## Optional
//! - `STORE_CURRENCY` - ISO 4217 currency for new carts (default: EUR)

use std::collections::HashMap;

use bookstall_core::CurrencyCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Commerce platform API configuration.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct CommerceConfig {
    /// Project key identifying the store on the platform
    pub project_key: String,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
    /// Base URL of the OAuth token service
    pub auth_url: String,
    /// Base URL of the commerce HTTP API
    pub api_url: String,
    /// OAuth scopes requested for every token
    pub scopes: Vec<String>,
    /// Currency used when creating carts
    pub currency: CurrencyCode,
}

impl std::fmt::Debug for CommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceConfig")
            .field("project_key", &self.project_key)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_url", &self.auth_url)
            .field("api_url", &self.api_url)
            .field("scopes", &self.scopes)
            .field("currency", &self.currency)
            .finish()
    }
}

impl CommerceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the client secret fails validation (placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let project_key = get_required_env("CTP_PROJECT_KEY")?;
        let client_id = get_required_env("CTP_CLIENT_ID")?;
        let client_secret = get_validated_secret("CTP_CLIENT_SECRET")?;
        let auth_url = get_url("CTP_AUTH_URL")?;
        let api_url = get_url("CTP_API_URL")?;
        let scopes = parse_scopes(&get_required_env("CTP_SCOPES")?)?;
        let currency = parse_currency(&get_env_or_default("STORE_CURRENCY", "EUR"))?;

        Ok(Self {
            project_key,
            client_id,
            client_secret,
            auth_url,
            api_url,
            scopes,
            currency,
        })
    }

    /// The scopes joined as a single OAuth `scope` parameter.
    #[must_use]
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a required environment variable and check it parses as a URL.
fn get_url(key: &str) -> Result<String, ConfigError> {
    let value = get_required_env(key)?;
    url::Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    // Trailing slashes would double up when joining paths
    Ok(value.trim_end_matches('/').to_string())
}

/// Split a space-separated scope list, rejecting an empty result.
fn parse_scopes(raw: &str) -> Result<Vec<String>, ConfigError> {
    let scopes: Vec<String> = raw
        .split_whitespace()
        .map(ToString::to_string)
        .collect();
    if scopes.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            "CTP_SCOPES".to_string(),
            "must contain at least one scope".to_string(),
        ));
    }
    Ok(scopes)
}

fn parse_currency(raw: &str) -> Result<CurrencyCode, ConfigError> {
    match raw.to_ascii_uppercase().as_str() {
        "EUR" => Ok(CurrencyCode::EUR),
        "USD" => Ok(CurrencyCode::USD),
        "GBP" => Ok(CurrencyCode::GBP),
        other => Err(ConfigError::InvalidEnvVar(
            "STORE_CURRENCY".to_string(),
            format!("unsupported currency {other}"),
        )),
    }
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

    // Check entropy (real client secrets have high entropy)
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
