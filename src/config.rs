use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Runtime settings for the console.
///
/// Every field can be overridden from the environment with the
/// `VOICETASK_*` variables read by [`ConsoleConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Base URL of the backend, without a trailing slash.
    pub api_url: String,
    /// Upper bound for plain read/write requests.
    pub request_timeout_secs: u64,
    /// Upper bound for assignment and status requests. A request that
    /// exceeds it releases the task's pending marker.
    pub assignment_timeout_secs: u64,
    /// Where the session token is persisted. `None` uses the platform data dir.
    pub token_path: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            assignment_timeout_secs: 30,
            token_path: None,
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("VOICETASK_API_URL") {
            config.api_url = url;
        }
        if let Ok(secs) = std::env::var("VOICETASK_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_secs("VOICETASK_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Ok(secs) = std::env::var("VOICETASK_ASSIGNMENT_TIMEOUT_SECS") {
            config.assignment_timeout_secs =
                parse_secs("VOICETASK_ASSIGNMENT_TIMEOUT_SECS", &secs)?;
        }
        if let Ok(path) = std::env::var("VOICETASK_TOKEN_PATH") {
            config.token_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_assignment_timeout(mut self, secs: u64) -> Self {
        self.assignment_timeout_secs = secs;
        self
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConsoleError::Config(format!(
                "api_url must start with http:// or https://, got {}",
                self.api_url
            )));
        }
        if self.request_timeout_secs == 0 || self.assignment_timeout_secs == 0 {
            return Err(ConsoleError::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn assignment_timeout(&self) -> Duration {
        Duration::from_secs(self.assignment_timeout_secs)
    }
}

fn parse_secs(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ConsoleError::Config(format!("{} must be a number of seconds, got {:?}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConsoleConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.assignment_timeout(), Duration::from_secs(30));
        assert!(config.token_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let config = ConsoleConfig::default().with_api_url("https://api.example.com/");
        assert_eq!(config.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ConsoleConfig::default().with_api_url("localhost:8000");
        assert!(matches!(config.validate(), Err(ConsoleError::Config(_))));

        let config = ConsoleConfig::default().with_assignment_timeout(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("X", " 12 ").unwrap(), 12);
        assert!(parse_secs("X", "soon").is_err());
    }
}
