//! Service layer for the monitor.
//!
//! This module contains the external boundaries:
//! - Post fetching (`PostFetcher`, `FeedFetcher`)
//! - Notification delivery (`Notifier`, `HttpNotifier`)

mod feed;
mod fetcher;
mod notifier;

pub use feed::FeedFetcher;
pub use fetcher::{FetchRequest, PinnedPostFilter, PostFetcher, PostFilter, collect_sample};
pub use notifier::{HttpNotifier, Notifier};
