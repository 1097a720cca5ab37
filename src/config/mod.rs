//! Configuration loading for the breaddie service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `BREADDIE_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "BREADDIE_";
const REDACTED: &str = "[REDACTED]";

/// Application configuration derived from `BREADDIE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Public site URL used for canonical links and redirects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    /// Deployment URL injected by the hosting platform, used when `site_url` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vercel_url: Option<String>,
    #[serde(default = "default_supabase_url")]
    pub supabase_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_anon_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_service_role_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_story_model")]
    pub story_model: String,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            site_url: None,
            vercel_url: None,
            supabase_url: default_supabase_url(),
            supabase_anon_key: None,
            supabase_service_role_key: None,
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            story_model: default_story_model(),
            http_timeout_ms: default_http_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Timeout applied to outbound HTTP calls (backend and model provider).
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// True when running against a local stack: storage is served from the
    /// local filesystem and redirects keep the request origin.
    pub fn is_development(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "development")
            || self.supabase_url.contains("localhost")
    }

    /// Key used for row access: service role when configured, anon otherwise.
    pub fn supabase_row_key(&self) -> Option<&str> {
        self.supabase_service_role_key
            .as_deref()
            .or(self.supabase_anon_key.as_deref())
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        for secret in [
            &mut config.supabase_anon_key,
            &mut config.supabase_service_role_key,
            &mut config.openai_api_key,
        ] {
            if secret.is_some() {
                *secret = Some(REDACTED.to_string());
            }
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.supabase_url).map_err(|source| ConfigError::InvalidSupabaseUrl {
            value: self.supabase_url.clone(),
            source,
        })?;

        if self.http_timeout_ms == 0 {
            return Err(ConfigError::InvalidHttpTimeout {
                value: self.http_timeout_ms,
            });
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        // Local and test stacks run against an unauthenticated emulator.
        if !matches!(self.profile.as_str(), "local" | "test") {
            if self.supabase_row_key().is_none() {
                return Err(ConfigError::MissingSupabaseKey);
            }
            if self.openai_api_key.is_none() {
                return Err(ConfigError::MissingOpenAiKey);
            }
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_supabase_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_story_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

fn default_http_timeout_ms() -> u64 {
    30_000
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid supabase url '{value}': {source}")]
    InvalidSupabaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("http timeout must be positive, got {value}")]
    InvalidHttpTimeout { value: u64 },
    #[error("invalid http timeout '{value}': {source}")]
    UnparsableHttpTimeout {
        value: String,
        source: std::num::ParseIntError,
    },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error(
        "supabase key is missing; set BREADDIE_SUPABASE_SERVICE_ROLE_KEY or BREADDIE_SUPABASE_ANON_KEY"
    )]
    MissingSupabaseKey,
    #[error("openai api key is missing; set BREADDIE_OPENAI_API_KEY")]
    MissingOpenAiKey,
}

/// Loads configuration using layered `.env` files and `BREADDIE_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let mut take = |key: &str| layered.remove(key).filter(|v| !v.trim().is_empty());

        let profile = take("PROFILE").unwrap_or(profile_hint);
        let api_bind_addr = take("API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take("LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = take("LOG_FORMAT").unwrap_or_else(default_log_format);
        let site_url = take("SITE_URL");
        let vercel_url = take("VERCEL_URL");
        let supabase_url = take("SUPABASE_URL").unwrap_or_else(default_supabase_url);
        let supabase_anon_key = take("SUPABASE_ANON_KEY");
        let supabase_service_role_key = take("SUPABASE_SERVICE_ROLE_KEY");
        let openai_api_key = take("OPENAI_API_KEY");
        let openai_base_url = take("OPENAI_BASE_URL").unwrap_or_else(default_openai_base_url);
        let story_model = take("STORY_MODEL").unwrap_or_else(default_story_model);
        let http_timeout_ms = match take("HTTP_TIMEOUT_MS") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::UnparsableHttpTimeout { value, source })?,
            None => default_http_timeout_ms(),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            site_url,
            vercel_url,
            supabase_url,
            supabase_anon_key,
            supabase_service_role_key,
            openai_api_key,
            openai_base_url,
            story_model,
            http_timeout_ms,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_for_local_profile() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_development());
    }

    #[test]
    fn production_profile_requires_keys() {
        let config = AppConfig {
            profile: "prod".to_string(),
            supabase_url: "https://project.supabase.co".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSupabaseKey)
        ));

        let config = AppConfig {
            supabase_anon_key: Some("anon".to_string()),
            ..config
        };
        assert!(matches!(config.validate(), Err(ConfigError::MissingOpenAiKey)));
    }

    #[test]
    fn development_detection_follows_supabase_host() {
        let config = AppConfig {
            profile: "prod".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_development());

        let config = AppConfig {
            supabase_url: "https://project.supabase.co".to_string(),
            ..config
        };
        assert!(!config.is_development());
    }

    #[test]
    fn service_role_key_takes_precedence() {
        let config = AppConfig {
            supabase_anon_key: Some("anon".to_string()),
            supabase_service_role_key: Some("service".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.supabase_row_key(), Some("service"));
    }

    #[test]
    fn redacted_json_hides_secrets() {
        let config = AppConfig {
            openai_api_key: Some("sk-live-secret".to_string()),
            supabase_service_role_key: Some("service-secret".to_string()),
            ..AppConfig::default()
        };
        let json = config.redacted_json().unwrap();
        assert!(!json.contains("sk-live-secret"));
        assert!(!json.contains("service-secret"));
        assert!(json.contains(REDACTED));
    }

    #[test]
    fn rejects_unknown_log_format() {
        let config = AppConfig {
            log_format: "xml".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogFormat { .. })
        ));
    }
}
