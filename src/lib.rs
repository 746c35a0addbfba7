// src/lib.rs

//! groupwatch: watch a group or page and get notified about new posts.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;

pub use config::MonitorSettings;
pub use error::{AppError, Result};
