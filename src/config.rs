//! Process configuration
//!
//! Read once in `main` and handed to the library as explicit values.

use crate::llm::{LlmConfig, DEFAULT_MODEL};
use crate::workflow::WorkflowConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Instructions for the routing model
pub const ROUTER_SYSTEM_PROMPT: &str = "You answer questions about US cities. \
Use sql_tool for population and state facts from the city_stats table and \
document_search for everything else about a city. Call several tools at once \
when a question needs more than one source, then answer from their results.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub port: u16,
    pub timeout: Duration,
    pub verbose: bool,
    /// Directory of `.md`/`.txt` city documents; built-in notes when unset
    pub docs_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let port = parse(&get, "CITY_ROUTER_PORT", DEFAULT_PORT)?;
        let timeout_secs = parse(&get, "CITY_ROUTER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "CITY_ROUTER_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let verbose = match get("CITY_ROUTER_VERBOSE") {
            None => true,
            Some(v) => parse_bool(&v).ok_or_else(|| ConfigError::Invalid {
                var: "CITY_ROUTER_VERBOSE",
                value: v.clone(),
                reason: "expected true/false".to_string(),
            })?,
        };

        Ok(Self {
            api_key,
            base_url: get("OPENAI_BASE_URL"),
            model: get("CITY_ROUTER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port,
            timeout: Duration::from_secs(timeout_secs),
            verbose,
            docs_dir: get("CITY_ROUTER_DOCS_DIR").map(PathBuf::from),
        })
    }

    pub fn llm_config(&self) -> LlmConfig {
        let mut config = LlmConfig::new(self.api_key.clone());
        config.base_url.clone_from(&self.base_url);
        config.model.clone_from(&self.model);
        config
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            timeout: self.timeout,
            verbose: self.verbose,
            system_prompt: Some(ROUTER_SYSTEM_PROMPT.to_string()),
            ..WorkflowConfig::default()
        }
    }
}

fn parse<T>(
    get: impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(c.model, "gpt-3.5-turbo");
        assert_eq!(c.port, 8000);
        assert_eq!(c.timeout, Duration::from_secs(120));
        assert!(c.verbose);
        assert!(c.docs_dir.is_none());

        let wf = c.workflow_config();
        assert_eq!(wf.timeout, Duration::from_secs(120));
        assert_eq!(wf.max_rounds, 10);
        assert!(wf.system_prompt.is_some());
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:4000/v1"),
            ("CITY_ROUTER_MODEL", "gpt-4o-mini"),
            ("CITY_ROUTER_PORT", "9001"),
            ("CITY_ROUTER_TIMEOUT_SECS", "30"),
            ("CITY_ROUTER_VERBOSE", "off"),
            ("CITY_ROUTER_DOCS_DIR", "/srv/cities"),
        ])
        .unwrap();
        assert_eq!(c.port, 9001);
        assert!(!c.verbose);
        assert_eq!(c.docs_dir, Some(PathBuf::from("/srv/cities")));

        let llm = c.llm_config();
        assert_eq!(llm.model, "gpt-4o-mini");
        assert_eq!(llm.base_url.as_deref(), Some("http://localhost:4000/v1"));
    }

    #[test]
    fn test_missing_key() {
        assert_eq!(
            config(&[("OPENAI_API_KEY", "  ")]).unwrap_err(),
            ConfigError::Missing("OPENAI_API_KEY")
        );
    }

    #[test]
    fn test_invalid_values() {
        let err =
            config(&[("OPENAI_API_KEY", "k"), ("CITY_ROUTER_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "CITY_ROUTER_PORT", .. }));

        let err =
            config(&[("OPENAI_API_KEY", "k"), ("CITY_ROUTER_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "CITY_ROUTER_TIMEOUT_SECS", .. }));

        let err =
            config(&[("OPENAI_API_KEY", "k"), ("CITY_ROUTER_VERBOSE", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "CITY_ROUTER_VERBOSE", .. }));
    }
}
