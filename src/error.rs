// src/error.rs

//! Unified error handling for the monitor.

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Neither credentials nor a cookies file were supplied (or both were)
    #[error("No auth info: {0}")]
    NoAuthInfo(String),

    /// Polling frequency text could not be parsed
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider is temporarily refusing requests
    #[error("Temporarily banned: {0}")]
    TemporarilyBanned(String),

    /// Provider disabled the account
    #[error("Account disabled: {0}")]
    AccountDisabled(String),

    /// Fetching posts failed for a reason other than a ban
    #[error("Fetch error for {context}: {message}")]
    Fetch { context: String, message: String },

    /// Delivering a notification failed
    #[error("Notification error ({scheme}): {message}")]
    Notification { scheme: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error with context.
    pub fn fetch(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error for a destination scheme.
    pub fn notification(scheme: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Notification {
            scheme: scheme.into(),
            message: message.to_string(),
        }
    }

    /// Temporary ban, eligible for retry.
    pub fn is_transient_ban(&self) -> bool {
        matches!(self, Self::TemporarilyBanned(_))
    }

    /// Permanent ban, never retried.
    pub fn is_permanent_ban(&self) -> bool {
        matches!(self, Self::AccountDisabled(_))
    }

    /// Errors that must stop the process before scheduling starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoAuthInfo(_) | Self::InvalidFrequency(_) | Self::Config(_) | Self::Validation(_)
        )
    }
}
