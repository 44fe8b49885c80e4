//! Environment-driven application configuration.
//!
//! # Invariants
//! - Blank values are treated as unset.
//! - Invalid values are rejected rather than silently replaced by defaults.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_OPENROUTER_MODEL: &str = "moonshotai/kimi-k2:free";
pub const DEFAULT_OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_COUNTRY_CODE: &str = "+91";
pub const DEFAULT_ACTOR: &str = "local";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;

const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
const ENV_MODEL: &str = "OPENROUTER_MODEL";
const ENV_ENDPOINT: &str = "OPENROUTER_ENDPOINT";
const ENV_AI_TIMEOUT: &str = "CALLDECK_AI_TIMEOUT_SECS";
const ENV_COUNTRY_CODE: &str = "CALLDECK_DEFAULT_COUNTRY_CODE";
const ENV_ACTOR: &str = "CALLDECK_ACTOR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `None` disables AI suggestions.
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,
    pub openrouter_endpoint: String,
    pub ai_timeout: Duration,
    /// Prefix for phone numbers written without an international prefix.
    pub default_country_code: String,
    /// Identity recorded as `last_engaged_by`.
    pub actor: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openrouter_api_key: None,
            openrouter_model: DEFAULT_OPENROUTER_MODEL.to_string(),
            openrouter_endpoint: DEFAULT_OPENROUTER_ENDPOINT.to_string(),
            ai_timeout: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            actor: DEFAULT_ACTOR.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let ai_timeout = match read(ENV_AI_TIMEOUT) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_AI_TIMEOUT,
                        value: raw,
                        expected: "a positive number of seconds",
                    })
                }
            },
            None => defaults.ai_timeout,
        };

        let default_country_code = match read(ENV_COUNTRY_CODE) {
            Some(code) if is_country_code(&code) => code,
            Some(code) => {
                return Err(ConfigError::InvalidValue {
                    key: ENV_COUNTRY_CODE,
                    value: code,
                    expected: "`+` followed by 1-4 digits",
                })
            }
            None => defaults.default_country_code,
        };

        Ok(Self {
            openrouter_api_key: read(ENV_API_KEY),
            openrouter_model: read(ENV_MODEL).unwrap_or(defaults.openrouter_model),
            openrouter_endpoint: read(ENV_ENDPOINT).unwrap_or(defaults.openrouter_endpoint),
            ai_timeout,
            default_country_code,
            actor: read(ENV_ACTOR).unwrap_or(defaults.actor),
        })
    }

    pub fn ai_enabled(&self) -> bool {
        self.openrouter_api_key.is_some()
    }
}

fn is_country_code(value: &str) -> bool {
    value.strip_prefix('+').is_some_and(|digits| {
        (1..=4).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "invalid {key}=`{value}`: expected {expected}"),
        }
    }
}

impl Error for ConfigError {}
