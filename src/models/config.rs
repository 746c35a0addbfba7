//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{FrequencySpec, TargetKind};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// What to watch and how often
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Provider credentials
    #[serde(default)]
    pub auth: AuthConfig,

    /// Post feed client settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Backoff ladder for temporary bans
    #[serde(default)]
    pub retry: RetryConfig,

    /// Notification destination
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.sample_count == 0 {
            return Err(AppError::validation("monitor.sample_count must be > 0"));
        }
        if self.monitor.page_limit == Some(0) {
            return Err(AppError::validation("monitor.page_limit must be > 0"));
        }
        FrequencySpec::parse(&self.monitor.frequency)?;

        url::Url::parse(&self.fetch.endpoint)?;
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if let Some(ua) = &self.fetch.user_agent {
            if ua.trim().is_empty() {
                return Err(AppError::validation("fetch.user_agent is empty"));
            }
        }

        self.retry.validate()?;

        if self.notify.timeout_secs == 0 {
            return Err(AppError::validation("notify.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Monitored target and polling behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Group or page identifier
    #[serde(default)]
    pub target: String,

    /// Whether `target` is a group or a page
    #[serde(default)]
    pub target_kind: TargetKind,

    /// Maximum number of posts per sample
    #[serde(default = "defaults::sample_count")]
    pub sample_count: usize,

    /// Maximum number of provider pages per fetch (unlimited when absent)
    #[serde(default)]
    pub page_limit: Option<u32>,

    /// Polling frequency, fixed (`"1h"`) or ranged (`"1h..2h"`)
    #[serde(default = "defaults::frequency")]
    pub frequency: String,

    /// Report failed cycles through the notifier
    #[serde(default)]
    pub include_errors: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            target_kind: TargetKind::Group,
            sample_count: defaults::sample_count(),
            page_limit: None,
            frequency: defaults::frequency(),
            include_errors: false,
        }
    }
}

/// Provider credentials. Either a username/password pair or a cookies file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub cookies_file: Option<PathBuf>,
}

/// Post feed client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Base URL of the post feed service
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    /// User-Agent override for feed requests
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::fetch_timeout")]
    pub timeout_secs: u64,

    /// Drop pinned posts whose URL lacks a marker query parameter
    #[serde(default)]
    pub pinned_filter: Option<PinnedFilterConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            user_agent: None,
            timeout_secs: defaults::fetch_timeout(),
            pinned_filter: None,
        }
    }
}

/// Query parameter marking regular (non-pinned) posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinnedFilterConfig {
    /// Query parameter name to inspect
    pub param: String,

    /// Required value prefix for a post to be kept
    pub prefix: String,
}

/// Retry ladder for temporary provider bans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total fetch attempts per cycle
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Sleep before attempt `n + 1`, in seconds, strictly increasing
    #[serde(default = "defaults::backoff_secs")]
    pub backoff_secs: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            backoff_secs: defaults::backoff_secs(),
        }
    }
}

impl RetryConfig {
    /// Backoff ladder as durations.
    pub fn ladder(&self) -> Vec<Duration> {
        self.backoff_secs
            .iter()
            .map(|s| Duration::from_secs(*s))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        let needed = (self.max_attempts - 1) as usize;
        if self.backoff_secs.len() < needed {
            return Err(AppError::validation(format!(
                "retry.backoff_secs needs at least {} entries for {} attempts",
                needed, self.max_attempts
            )));
        }
        if self.backoff_secs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AppError::validation(
                "retry.backoff_secs must be strictly increasing",
            ));
        }
        Ok(())
    }
}

/// Notification destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Destination URL; its scheme selects the transport and digest format
    #[serde(default)]
    pub url: String,

    /// Delivery timeout in seconds
    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: defaults::notify_timeout(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Monitor defaults
    pub fn sample_count() -> usize {
        5
    }
    pub fn frequency() -> String {
        "1h".into()
    }

    // Fetch defaults
    pub fn endpoint() -> String {
        "http://127.0.0.1:8080".into()
    }
    pub fn fetch_timeout() -> u64 {
        60
    }

    // Retry defaults: 10, ~12 and ~13 minutes
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn backoff_secs() -> Vec<u64> {
        vec![600, 700, 800]
    }

    // Notify defaults
    pub fn notify_timeout() -> u64 {
        30
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_sample_count() {
        let mut config = Config::default();
        config.monitor.sample_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_frequency() {
        let mut config = Config::default();
        config.monitor.frequency = "often".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::InvalidFrequency(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.fetch.user_agent = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_ladder_must_increase() {
        let retry = RetryConfig {
            max_attempts: 3,
            backoff_secs: vec![600, 600, 800],
        };
        assert!(retry.validate().is_err());
    }

    #[test]
    fn retry_ladder_must_cover_attempts() {
        let retry = RetryConfig {
            max_attempts: 4,
            backoff_secs: vec![1, 2],
        };
        assert!(retry.validate().is_err());

        let retry = RetryConfig {
            max_attempts: 1,
            backoff_secs: vec![],
        };
        assert!(retry.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [monitor]
            target = "1092319230"
            target_kind = "page"
            frequency = "30m..90m"

            [fetch.pinned_filter]
            param = "_ft_"
            prefix = "qid"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.target, "1092319230");
        assert_eq!(config.monitor.target_kind, TargetKind::Page);
        assert_eq!(config.monitor.sample_count, 5);
        assert_eq!(config.retry.backoff_secs, vec![600, 700, 800]);
        assert_eq!(
            config.fetch.pinned_filter,
            Some(PinnedFilterConfig {
                param: "_ft_".into(),
                prefix: "qid".into()
            })
        );
        assert!(config.validate().is_ok());
    }
}
