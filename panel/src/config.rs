//! Client configuration resolved at build time.
//!
//! The panel ships as a static WASM bundle, so configuration comes from
//! environment variables captured by `option_env!` when the bundle is built.
//! Unset variables fall back to the defaults below; malformed ones are errors.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_RELEASE_GRACE_MS: u64 = 1500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the chat API, without a trailing slash.
    pub api_base_url: String,
    /// Maximum number of messages kept in the conversation log.
    pub history_limit: usize,
    /// Delay before a replaced or consumed attachment preview is released.
    pub release_grace: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            release_grace: Duration::from_millis(DEFAULT_RELEASE_GRACE_MS),
        }
    }
}

impl ClientConfig {
    /// Build config from variables captured at compile time.
    ///
    /// - `HYPEWAVE_API_URL`: default `http://127.0.0.1:8000`
    /// - `HYPEWAVE_HISTORY_LIMIT`: default 20, must be at least 1
    /// - `HYPEWAVE_RELEASE_GRACE_MS`: default 1500
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any value that does not parse.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::from_values(
            option_env!("HYPEWAVE_API_URL"),
            option_env!("HYPEWAVE_HISTORY_LIMIT"),
            option_env!("HYPEWAVE_RELEASE_GRACE_MS"),
        )
    }

    /// Build config from optional raw values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any value that does not parse.
    pub fn from_values(
        api_base_url: Option<&str>,
        history_limit: Option<&str>,
        release_grace_ms: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let api_base_url = parse_base_url(api_base_url)?;
        let history_limit = match history_limit {
            None => DEFAULT_HISTORY_LIMIT,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(invalid("HYPEWAVE_HISTORY_LIMIT", raw)),
            },
        };
        let grace_ms = match release_grace_ms {
            None => DEFAULT_RELEASE_GRACE_MS,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid("HYPEWAVE_RELEASE_GRACE_MS", raw))?,
        };
        Ok(Self { api_base_url, history_limit, release_grace: Duration::from_millis(grace_ms) })
    }
}

fn parse_base_url(raw: Option<&str>) -> Result<String, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_API_BASE_URL.to_owned());
    };
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(invalid("HYPEWAVE_API_URL", raw));
    }
    Ok(trimmed.to_owned())
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_owned() }
}
