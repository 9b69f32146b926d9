//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use runner_api::{RunnerApiConfig, DEFAULT_RUNNER_BASE_URL};

use crate::logging::{self, DEFAULT_LOG_FILTER};

pub const ENV_API_BASE_URL: &str = "EDITOR_SESSION_API_BASE_URL";
pub const ENV_EXECUTION_TIMEOUT_MS: &str = "EDITOR_SESSION_EXECUTION_TIMEOUT_MS";
pub const ENV_HEALTH_TIMEOUT_MS: &str = "EDITOR_SESSION_HEALTH_TIMEOUT_MS";
pub const ENV_CREDENTIALS_PATH: &str = "EDITOR_SESSION_CREDENTIALS_PATH";
pub const ENV_LOG: &str = "EDITOR_SESSION_LOG";

pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub api_base_url: String,
    /// Caller-imposed bound on a single execution; `None` waits indefinitely.
    pub execution_timeout: Option<Duration>,
    pub health_timeout: Duration,
    /// Where the signed-in identity is persisted; `None` keeps it in memory only.
    pub credentials_path: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_RUNNER_BASE_URL.to_string(),
            execution_timeout: Some(DEFAULT_EXECUTION_TIMEOUT),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            credentials_path: None,
            log_filter: None,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env_string_opt(ENV_API_BASE_URL).unwrap_or(defaults.api_base_url),
            execution_timeout: match env_millis_opt(ENV_EXECUTION_TIMEOUT_MS) {
                Some(0) => None,
                Some(millis) => Some(Duration::from_millis(millis)),
                None => defaults.execution_timeout,
            },
            health_timeout: env_millis_opt(ENV_HEALTH_TIMEOUT_MS)
                .filter(|millis| *millis > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.health_timeout),
            credentials_path: env_string_opt(ENV_CREDENTIALS_PATH).map(PathBuf::from),
            log_filter: env_string_opt(ENV_LOG),
        }
    }

    /// Directives the host log subscriber is installed with.
    pub fn log_directives(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Installs the global log subscriber from [`Self::log_directives`].
    /// Returns `false` when one was already installed.
    pub fn init_logging(&self) -> bool {
        logging::init(Some(self.log_directives()))
    }

    /// Transport settings derived from this config.
    ///
    /// The execution bound is enforced by the orchestrator, not the client,
    /// so no run timeout is set here.
    pub fn runner_api_config(&self) -> RunnerApiConfig {
        RunnerApiConfig::new(self.api_base_url.clone()).with_health_timeout(self.health_timeout)
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_millis_opt(key: &str) -> Option<u64> {
    env_string_opt(key).and_then(|value| value.parse::<u64>().ok())
}
