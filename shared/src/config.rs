//! Runtime settings and credential lookup

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Settings loaded from the environment (and `.env`, when present)
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub max_parallel: usize,
    pub request_timeout: Duration,
    pub log_level: String,
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            request_timeout: Duration::from_secs(60),
            log_level: "info".to_string(),
            output_dir: PathBuf::from("./output"),
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read settings from the process environment
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&vars)
    }

    /// Build settings from key/value pairs; invalid values fall back to defaults
    pub fn from_map(vars: &HashMap<String, String>) -> Self {
        let defaults = Self::default();

        let max_parallel = parse_or(vars, "MAX_PARALLEL", defaults.max_parallel)
            .max(1);
        let timeout_secs = parse_or(vars, "REQUEST_TIMEOUT_SECS", defaults.request_timeout.as_secs());

        let log_level = match vars.get("LOG_LEVEL").map(|v| v.to_lowercase()) {
            Some(level) if ["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) => level,
            Some(other) => {
                warn!("Ignoring invalid LOG_LEVEL={}", other);
                defaults.log_level
            }
            None => defaults.log_level,
        };

        let output_dir = vars
            .get("OUTPUT_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        Self {
            max_parallel,
            request_timeout: Duration::from_secs(timeout_secs),
            log_level,
            output_dir,
        }
    }
}

fn parse_or<T: std::str::FromStr + Copy>(vars: &HashMap<String, String>, key: &str, default: T) -> T {
    match vars.get(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {}={}", key, raw);
                default
            }
        },
        None => default,
    }
}

/// Supplies API keys by provider name
#[mockall::automock]
pub trait CredentialSource: Send + Sync {
    fn api_key(&self, provider: &str) -> Option<String>;
}

/// Reads API keys from well-known environment variables
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    pub fn new() -> Self {
        let _ = dotenvy::dotenv();
        Self
    }

    /// Environment variables consulted for a provider, in order
    pub fn env_keys(provider: &str) -> &'static [&'static str] {
        match provider {
            "openai" => &["OPENAI_API_KEY"],
            "stability" => &["STABILITY_API_KEY"],
            "imagen" | "google" => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            "fashn" => &["FASHN_API_KEY"],
            _ => &[],
        }
    }
}

impl CredentialSource for EnvCredentials {
    fn api_key(&self, provider: &str) -> Option<String> {
        Self::env_keys(provider)
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

/// Fixed in-memory credentials
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    keys: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, provider: &str, key: &str) -> Self {
        self.keys.insert(provider.to_string(), key.to_string());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn api_key(&self, provider: &str) -> Option<String> {
        self.keys.get(provider).cloned()
    }
}
