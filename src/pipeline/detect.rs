//! Change detection between consecutive samples.
//!
//! The first sample after start-up only establishes a baseline, so a restart
//! never reports every visible post as new. An empty sample is treated as a
//! failed scrape and leaves the baseline untouched.

use std::collections::HashSet;

use crate::models::PostSample;

/// Post ids observed in the most recently processed sample.
#[derive(Debug, Clone, Default)]
pub struct SeenState {
    ids: Option<HashSet<String>>,
}

impl SeenState {
    /// State before the first successful fetch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a baseline sample has been adopted.
    pub fn is_set(&self) -> bool {
        self.ids.is_some()
    }

    pub fn ids(&self) -> Option<&HashSet<String>> {
        self.ids.as_ref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.as_ref().is_some_and(|ids| ids.contains(id))
    }

    fn adopt(&mut self, sample: &PostSample) {
        self.ids = Some(sample.ids().map(str::to_string).collect());
    }
}

/// Ids present in the latest sample but absent from the previous state, in sample order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    ids: Vec<String>,
}

impl Delta {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Compute the new posts in `sample` and advance `state`.
///
/// After any call, `state` is either unset or exactly the ids of the most
/// recent non-empty sample.
pub fn detect(sample: &PostSample, state: &mut SeenState) -> Delta {
    if sample.is_empty() {
        log::debug!("Empty sample, keeping previous state");
        return Delta::default();
    }

    let Some(seen) = state.ids.as_ref() else {
        log::debug!("Adopting {} posts as the baseline", sample.len());
        state.adopt(sample);
        return Delta::default();
    };

    let ids: Vec<String> = sample
        .ids()
        .filter(|id| !seen.contains(*id))
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        log::debug!("No new posts found");
        return Delta::default();
    }

    log::debug!("Found {} new posts", ids.len());
    state.adopt(sample);
    Delta { ids }
}
