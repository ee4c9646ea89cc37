//! # Application Configuration
//!
//! Process-level settings read from the environment. Component configs
//! (`ScraperConfig`, `SearchConfig`, `GenerationOptions`, ...) live beside
//! the components they configure and are built from these values.

use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_MODEL_RPM: u32 = 30;
pub const DEFAULT_DATABASE: &str = "studysets.db";
pub const DEFAULT_AGENT_MAX_ITERATIONS: u32 = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Settings shared by the library and the CLI
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Search API key; search degrades to no results without it
    pub serpapi_key: Option<String>,

    /// Generative model API key, required for any model path
    pub gemini_api_key: Option<String>,

    /// Model identifier passed to the provider
    pub model_id: String,

    /// Model requests allowed per minute
    pub model_requests_per_minute: u32,

    /// Path to the study-set database
    pub database_path: String,

    pub agent_max_iterations: u32,
    pub agent_timeout: Duration,
    pub agent_enable_trace: bool,

    /// Overall deadline for the sequential generation pipeline
    pub generation_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            serpapi_key: None,
            gemini_api_key: None,
            model_id: DEFAULT_MODEL.to_string(),
            model_requests_per_minute: DEFAULT_MODEL_RPM,
            database_path: DEFAULT_DATABASE.to_string(),
            agent_max_iterations: DEFAULT_AGENT_MAX_ITERATIONS,
            agent_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            agent_enable_trace: false,
            generation_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            serpapi_key: non_empty("SERPAPI_KEY"),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            model_id: non_empty("QTB_MODEL").unwrap_or(defaults.model_id),
            model_requests_per_minute: parse_var(
                "QTB_MODEL_RPM",
                non_empty("QTB_MODEL_RPM"),
                defaults.model_requests_per_minute,
            )?,
            database_path: non_empty("QTB_DATABASE").unwrap_or(defaults.database_path),
            agent_max_iterations: parse_var(
                "QTB_AGENT_MAX_ITERATIONS",
                non_empty("QTB_AGENT_MAX_ITERATIONS"),
                defaults.agent_max_iterations,
            )?,
            agent_timeout: Duration::from_secs(parse_var(
                "QTB_AGENT_TIMEOUT_SECS",
                non_empty("QTB_AGENT_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?),
            agent_enable_trace: parse_var(
                "QTB_AGENT_ENABLE_TRACE",
                non_empty("QTB_AGENT_ENABLE_TRACE"),
                false,
            )?,
            generation_timeout: Duration::from_secs(parse_var(
                "QTB_GENERATION_TIMEOUT_SECS",
                non_empty("QTB_GENERATION_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?),
        })
    }

    /// The model API key, or a configuration error when it is missing
    pub fn require_gemini_api_key(&self) -> Result<&str> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| Error::Config("GEMINI_API_KEY environment variable must be set".into()))
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model_id, "gemini-2.0-flash");
        assert_eq!(config.agent_timeout, Duration::from_secs(300));
        assert!(config.require_gemini_api_key().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("SERPAPI_KEY", "serp"),
            ("GEMINI_API_KEY", "gem"),
            ("QTB_MODEL_RPM", "60"),
            ("QTB_AGENT_ENABLE_TRACE", "true"),
            ("QTB_GENERATION_TIMEOUT_SECS", "45"),
        ]))
        .unwrap();
        assert_eq!(config.serpapi_key.as_deref(), Some("serp"));
        assert_eq!(config.require_gemini_api_key().unwrap(), "gem");
        assert_eq!(config.model_requests_per_minute, 60);
        assert!(config.agent_enable_trace);
        assert_eq!(config.generation_timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = AppConfig::from_lookup(lookup(&[("SERPAPI_KEY", "  ")])).unwrap();
        assert!(config.serpapi_key.is_none());
    }

    #[test]
    fn test_invalid_number() {
        let err = AppConfig::from_lookup(lookup(&[("QTB_AGENT_MAX_ITERATIONS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("QTB_AGENT_MAX_ITERATIONS"));
    }
}
