//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development. Empty variables count
//! as unset.

use std::env;
use std::time::Duration;

pub const DEFAULT_API_KEY: &str = "unsafe_secret";
pub const DEFAULT_SECRET_PEPPER: &str = "default_insecure_pepper";
pub const DEFAULT_PEPPER: &str = "default_secret_pepper";
pub const DEFAULT_PROFILE_PATH: &str = "config/dicom_ps3_15_profile.json";

/// RIS database connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub name: String,
    pub host: String,
    pub port: u16,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,
    /// Server port
    pub port: u16,
    pub database: DatabaseConfig,

    /// Expected `X-API-Key` value
    pub api_key: String,
    /// Pepper for patient IDs returned by the measurement API
    pub secret_pepper: String,
    /// Pepper for DICOM patient pseudonyms
    pub pepper: String,

    /// PACS DICOMweb proxy base URL
    pub pacs_proxy_url: Option<String>,
    /// RIS HTTP API base URL
    pub ris_api_url: Option<String>,
    pub anonymizer_api_key: Option<String>,
    pub anonymizer_profile: String,
    pub upstream_timeout: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8512,
            database: DatabaseConfig {
                user: "postgres".to_string(),
                password: "password".to_string(),
                name: "postgres".to_string(),
                host: "localhost".to_string(),
                port: 5432,
            },
            api_key: "test_api_key".to_string(),
            secret_pepper: "test_secret_pepper".to_string(),
            pepper: "test_pepper".to_string(),
            pacs_proxy_url: None,
            ris_api_url: None,
            anonymizer_api_key: None,
            anonymizer_profile: DEFAULT_PROFILE_PATH.to_string(),
            upstream_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let or = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: or("HOST", "0.0.0.0"),
            port: parse_or(get("PORT"), "PORT", 8512)?,
            database: DatabaseConfig {
                user: or("DB_USER", "postgres"),
                password: or("DB_PASSWORD", "password"),
                name: or("DB_NAME", "postgres"),
                host: or("DB_HOST", "lavie_postgres"),
                port: parse_or(get("DB_PORT"), "DB_PORT", 5432)?,
            },
            api_key: or("API_KEY", DEFAULT_API_KEY),
            secret_pepper: or("SECRET_PEPPER", DEFAULT_SECRET_PEPPER),
            pepper: or("PEPPER", DEFAULT_PEPPER),
            pacs_proxy_url: get("PACS_PROXY_URL"),
            ris_api_url: get("RIS_API_URL"),
            anonymizer_api_key: get("ANONYMIZER_API_KEY").map(|v| v.trim().to_string()),
            anonymizer_profile: or("ANONYMIZER_PROFILE", DEFAULT_PROFILE_PATH),
            upstream_timeout: Duration::from_secs(parse_or(
                get("UPSTREAM_TIMEOUT_SECS"),
                "UPSTREAM_TIMEOUT_SECS",
                30,
            )?),
        })
    }

    /// Log a warning for every insecure default still in use.
    pub fn warn_insecure_defaults(&self) {
        if self.api_key == DEFAULT_API_KEY {
            tracing::warn!("API_KEY is using the insecure default value");
        }
        if self.secret_pepper == DEFAULT_SECRET_PEPPER {
            tracing::warn!("SECRET_PEPPER is using the insecure default value");
        }
        if self.pepper == DEFAULT_PEPPER {
            tracing::warn!("PEPPER is using the insecure default value");
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, v)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}
