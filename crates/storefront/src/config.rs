//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MERCATO_BACKEND_URL` - Project URL of the hosted backend
//!   (e.g., <https://abc123.example.co>)
//! - `MERCATO_BACKEND_ANON_KEY` - Publishable API key for the backend
//!
//! ## Optional
//! - `MERCATO_DATA_DIR` - Directory for device-local state such as the cart
//!   blob (default: `.mercato`)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_API_KEY_LENGTH: usize = 20;

/// Placeholder fragments that must never appear in a real key
/// (matched case-insensitively).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Hosted backend configuration
    pub backend: BackendConfig,
    /// Directory for device-local state (cart blob, transient flags)
    pub data_dir: PathBuf,
}

/// Hosted backend configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project URL (scheme + host, no trailing path)
    pub project_url: Url,
    /// Publishable API key; sent with every request and used as the bearer
    /// token until a user signs in
    pub anon_key: SecretString,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("project_url", &self.project_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load the configuration from the process environment, reading a
    /// `.env` file first when one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or
    /// invalid, or when the API key fails placeholder validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; the variables may be set directly.
        let _ = dotenvy::dotenv();

        let backend = BackendConfig::from_env()?;
        let data_dir = PathBuf::from(get_env_or_default("MERCATO_DATA_DIR", ".mercato"));

        Ok(Self { backend, data_dir })
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("MERCATO_BACKEND_URL")?;
        let project_url = Url::parse(raw_url.trim_end_matches('/')).map_err(|e| {
            ConfigError::InvalidEnvVar("MERCATO_BACKEND_URL".to_string(), e.to_string())
        })?;

        if project_url.host_str().is_none() {
            return Err(ConfigError::InvalidEnvVar(
                "MERCATO_BACKEND_URL".to_string(),
                "URL must have a host".to_string(),
            ));
        }

        let anon_key = get_validated_key("MERCATO_BACKEND_ANON_KEY")?;

        Ok(Self {
            project_url,
            anon_key,
        })
    }
}

// =============================================================================
// Env helpers
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Validate that an API key is not a placeholder and is plausibly real.
fn validate_key_strength(key: &str, var_name: &str) -> Result<(), ConfigError> {
    if key.len() < MIN_API_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_API_KEY_LENGTH} characters (got {})",
                key.len()
            ),
        ));
    }

    let lower = key.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate an API key from environment.
fn get_validated_key(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_key_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_strength_placeholder() {
        let result = validate_key_strength("your-anon-key-goes-here", "TEST_VAR");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_key_strength_too_short() {
        let result = validate_key_strength("abc123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_key_strength_valid() {
        let result = validate_key_strength("sb_publishable_9f8e7d6c5b4a3210", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_backend_config_debug_redacts_key() {
        let config = BackendConfig {
            project_url: Url::parse("https://abc123.example.co").unwrap(),
            anon_key: SecretString::from("super_long_publishable_key_value"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("abc123.example.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_long_publishable_key_value"));
    }
}
