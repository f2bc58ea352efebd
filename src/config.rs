use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::i18n::Language;
use crate::settings::Settings;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Top-level configuration for the wizard and the bulk tool.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    /// Forced language; when unset the saved preference applies.
    pub language: Option<Language>,
    pub dataset: Option<PathBuf>,
    pub telemetry: TelemetryConfig,
}

/// Where and how the report API is reached.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl AppConfig {
    /// Reads `.env` if present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = var("AUDIT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let timeout = match var("AUDIT_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(value.clone()))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let language = var("AUDIT_LANG")
            .map(|value| {
                Language::from_code(&value).ok_or_else(|| ConfigError::InvalidLanguage(value.clone()))
            })
            .transpose()?;

        let config = Self {
            api: ApiConfig {
                base_url,
                timeout: Duration::from_secs(timeout),
            },
            language,
            dataset: var("AUDIT_DATASET").map(PathBuf::from),
            telemetry: TelemetryConfig {
                log_level: var("AUDIT_LOG_LEVEL").unwrap_or_else(|| "warn".to_string()),
            },
        };
        config.api.validate()?;
        Ok(config)
    }

    /// A language forced by the environment or the command line wins over the
    /// saved preference, which wins over English.
    pub fn resolve_language(&self, settings: &Settings) -> Language {
        self.language.or(settings.language).unwrap_or_default()
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidApiUrl {
            value: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ConfigError::InvalidApiUrl {
                value: self.base_url.clone(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("AUDIT_API_URL '{value}' is not a usable URL: {reason}")]
    InvalidApiUrl { value: String, reason: String },
    #[error("AUDIT_TIMEOUT_SECS must be a positive number of seconds, got '{0}'")]
    InvalidTimeout(String),
    #[error("AUDIT_LANG must be one of en, fr, ar, got '{0}'")]
    InvalidLanguage(String),
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_env_missing() {
        let config = load(&[]).expect("config loads with defaults");
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
        assert_eq!(config.api.timeout, Duration::from_secs(60));
        assert_eq!(config.language, None);
        assert_eq!(config.dataset, None);
        assert_eq!(config.telemetry.log_level, "warn");
    }

    #[test]
    fn test_reads_overrides() {
        let config = load(&[
            ("AUDIT_API_URL", "https://audit.example.com"),
            ("AUDIT_TIMEOUT_SECS", "15"),
            ("AUDIT_LANG", "ar"),
            ("AUDIT_DATASET", "/tmp/audit.json"),
            ("AUDIT_LOG_LEVEL", "debug"),
        ])
        .expect("config loads");
        assert_eq!(config.api.base_url, "https://audit.example.com");
        assert_eq!(config.api.timeout, Duration::from_secs(15));
        assert_eq!(config.language, Some(Language::Ar));
        assert_eq!(config.dataset, Some(PathBuf::from("/tmp/audit.json")));
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[("AUDIT_LANG", " "), ("AUDIT_API_URL", "")]).expect("config loads");
        assert_eq!(config.language, None);
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            load(&[("AUDIT_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::InvalidTimeout(_))
        ));
        assert!(matches!(
            load(&[("AUDIT_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidTimeout(_))
        ));
        assert!(matches!(
            load(&[("AUDIT_LANG", "de")]),
            Err(ConfigError::InvalidLanguage(_))
        ));
        assert!(matches!(
            load(&[("AUDIT_API_URL", "localhost:5000")]),
            Err(ConfigError::InvalidApiUrl { .. })
        ));
        assert!(matches!(
            load(&[("AUDIT_API_URL", "ftp://example.com")]),
            Err(ConfigError::InvalidApiUrl { .. })
        ));
    }

    #[test]
    fn test_resolve_language() {
        let saved = Settings {
            language: Some(Language::Fr),
        };

        let forced = load(&[("AUDIT_LANG", "ar")]).unwrap();
        assert_eq!(forced.resolve_language(&saved), Language::Ar);

        let unset = load(&[]).unwrap();
        assert_eq!(unset.resolve_language(&saved), Language::Fr);
        assert_eq!(unset.resolve_language(&Settings::default()), Language::En);
    }
}
