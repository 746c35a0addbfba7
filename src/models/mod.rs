// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod auth;
mod config;
mod destination;
mod frequency;
mod post;
mod target;

// Re-export all public types
pub use auth::{Auth, cookie_header};
pub use config::{
    AuthConfig, Config, FetchConfig, LoggingConfig, MonitorConfig, NotifyConfig,
    PinnedFilterConfig, RetryConfig,
};
pub use destination::{DestinationKind, scheme_of};
pub use frequency::{FrequencySpec, TimeUnit};
pub use post::{Post, PostSample};
pub use target::TargetKind;
