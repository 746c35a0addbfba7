// src/config.rs

//! Resolved runtime settings.
//!
//! [`Config`] mirrors the TOML file and CLI overrides loosely. This module
//! turns it into [`MonitorSettings`], the checked view the scheduler runs on,
//! so every configuration error surfaces before the first fetch.

use crate::error::{AppError, Result};
use crate::models::{Auth, Config, DestinationKind, FrequencySpec, TargetKind};
use crate::services::FetchRequest;

/// Validated monitor settings.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Group or page identifier
    pub target: String,
    pub target_kind: TargetKind,
    pub auth: Auth,
    pub frequency: FrequencySpec,
    pub sample_count: usize,
    pub page_limit: Option<u32>,
    /// Report failed cycles through the notifier
    pub include_errors: bool,
    /// Digest format, derived from `notify_url`
    pub destination: DestinationKind,
    pub notify_url: String,
}

impl MonitorSettings {
    /// Check `config` and build the settings.
    ///
    /// Fails with `NoAuthInfo` or `InvalidFrequency` for those specific
    /// problems and with `Config`/`Validation` for anything else, including
    /// a missing or empty cookies file.
    pub fn from_config(config: &Config) -> Result<Self> {
        let auth = Auth::resolve(
            config.auth.username.as_deref(),
            config.auth.password.as_deref(),
            config.auth.cookies_file.as_deref(),
        )?;
        auth.verify()?;
        config.validate()?;

        let target = config.monitor.target.trim();
        if target.is_empty() {
            return Err(AppError::config("No target group or page id given"));
        }
        let notify_url = config.notify.url.trim();
        if notify_url.is_empty() {
            return Err(AppError::config("No notification URL given"));
        }

        Ok(Self {
            target: target.to_string(),
            target_kind: config.monitor.target_kind,
            auth,
            frequency: FrequencySpec::parse(&config.monitor.frequency)?,
            sample_count: config.monitor.sample_count,
            page_limit: config.monitor.page_limit,
            include_errors: config.monitor.include_errors,
            destination: DestinationKind::classify(notify_url),
            notify_url: notify_url.to_string(),
        })
    }

    /// Fetch parameters for one cycle.
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            target: self.target.clone(),
            kind: self.target_kind,
            auth: self.auth.clone(),
            page_limit: self.page_limit,
            sample_count: self.sample_count,
        }
    }
}
