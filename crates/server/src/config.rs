//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GLOWPASS_DATABASE_URL` - `PostgreSQL` connection string
//! - `GLOWPASS_BASE_URL` - Public URL of this service; embedded in passes as
//!   the wallet callback URL
//! - `PASS_TYPE_IDENTIFIER` - Apple pass type identifier (e.g. pass.com.glowpass)
//! - `APPLE_TEAM_IDENTIFIER` - Apple developer team identifier
//! - `PASS_ORGANIZATION_NAME` - Organization name shown on the pass
//! - `PASS_TEMPLATE_DIR` - Directory holding icon.png / logo.png / strip.png
//! - `PASS_ARTIFACTS_DIR` - Directory built .pkpass containers are written to
//! - `PASS_CERTIFICATE_PATH` - Pass signing certificate (PEM)
//! - `PASS_PRIVATE_KEY_PATH` - Pass signing private key (PEM)
//! - `WWDR_CERTIFICATE_PATH` - Apple WWDR intermediate CA certificate (PEM)
//!
//! ## Optional
//! - `GLOWPASS_HOST` - Bind address (default: 127.0.0.1)
//! - `GLOWPASS_PORT` - Listen port (default: 3001)
//! - `APNS_ENDPOINT` - Push gateway origin (default: https://api.push.apple.com;
//!   point at api.sandbox.push.apple.com for development builds)
//! - `SIGNING_TIMEOUT_SECS` - Signing subprocess timeout (default: 10)
//! - `PUSH_TIMEOUT_SECS` - Push send timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use glowpass_core::PassTypeId;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Wallet service configuration.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, embedded in passes as `webServiceURL`
    pub base_url: String,
    /// Pass building and signing configuration
    pub pass: PassConfig,
    /// Push gateway configuration
    pub apns: ApnsConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Pass building and signing configuration.
#[derive(Debug, Clone)]
pub struct PassConfig {
    /// Apple pass type identifier; also the push topic
    pub pass_type_id: PassTypeId,
    /// Apple developer team identifier
    pub team_id: String,
    /// Organization name shown on the pass
    pub organization_name: String,
    /// Template directory with the fixed image set
    pub template_dir: PathBuf,
    /// Directory built containers are written to
    pub artifacts_dir: PathBuf,
    /// Pass signing certificate (PEM)
    pub certificate_path: PathBuf,
    /// Pass signing private key (PEM)
    pub private_key_path: PathBuf,
    /// Apple WWDR intermediate CA certificate (PEM)
    pub wwdr_certificate_path: PathBuf,
    /// Bound on the signing subprocess
    pub signing_timeout: Duration,
}

/// Push gateway configuration.
#[derive(Debug, Clone)]
pub struct ApnsConfig {
    /// Gateway origin, e.g. `https://api.push.apple.com`
    pub endpoint: String,
    /// Bound on one push send
    pub push_timeout: Duration,
}

impl WalletConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("GLOWPASS_DATABASE_URL")?;
        let host = get_env_or_default("GLOWPASS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("GLOWPASS_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("GLOWPASS_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("GLOWPASS_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("GLOWPASS_BASE_URL")?;
        validate_base_url(&base_url, "GLOWPASS_BASE_URL")?;

        let pass = PassConfig::from_env()?;
        let apns = ApnsConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            pass,
            apns,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PassConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            pass_type_id: PassTypeId::new(get_required_env("PASS_TYPE_IDENTIFIER")?),
            team_id: get_required_env("APPLE_TEAM_IDENTIFIER")?,
            organization_name: get_required_env("PASS_ORGANIZATION_NAME")?,
            template_dir: PathBuf::from(get_required_env("PASS_TEMPLATE_DIR")?),
            artifacts_dir: PathBuf::from(get_required_env("PASS_ARTIFACTS_DIR")?),
            certificate_path: PathBuf::from(get_required_env("PASS_CERTIFICATE_PATH")?),
            private_key_path: PathBuf::from(get_required_env("PASS_PRIVATE_KEY_PATH")?),
            wwdr_certificate_path: PathBuf::from(get_required_env("WWDR_CERTIFICATE_PATH")?),
            signing_timeout: get_timeout("SIGNING_TIMEOUT_SECS", 10)?,
        })
    }
}

impl ApnsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: get_env_or_default("APNS_ENDPOINT", "https://api.push.apple.com"),
            push_timeout: get_timeout("PUSH_TIMEOUT_SECS", 10)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
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

/// Parse a timeout in whole seconds with a default.
fn get_timeout(key: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    let raw = get_env_or_default(key, &default_secs.to_string());
    let secs = raw
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "timeout must be at least 1 second".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Validate that the base URL parses and carries a host.
fn validate_base_url(base_url: &str, var_name: &str) -> Result<(), ConfigError> {
    let url = url::Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "URL must have a host".to_string(),
        ));
    }
    Ok(())
}
