// src/services/fetcher.rs

//! Post fetcher boundary.
//!
//! The provider is opaque to the rest of the crate: a fetcher yields posts
//! lazily, most recent first, and consumers stop polling once they have
//! enough. Provider-specific quirks (such as pinned posts) are handled by
//! [`PostFilter`]s injected into fetcher implementations.

use futures::StreamExt;
use futures::stream::BoxStream;
use url::Url;

use crate::error::Result;
use crate::models::{Auth, PinnedFilterConfig, Post, PostSample, TargetKind};

/// Parameters for one fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Group or page identifier
    pub target: String,
    /// Whether `target` is a group or a page
    pub kind: TargetKind,
    /// Provider authentication
    pub auth: Auth,
    /// Maximum provider pages to request (unlimited when `None`)
    pub page_limit: Option<u32>,
    /// Sample cap; also used as the page size hint
    pub sample_count: usize,
}

/// Source of recent posts for a target.
pub trait PostFetcher: Send + Sync {
    /// Stream posts for the request in provider order.
    ///
    /// Yields `AppError::TemporarilyBanned` or `AppError::AccountDisabled`
    /// when the provider refuses service.
    fn fetch_posts<'a>(&'a self, request: &'a FetchRequest) -> BoxStream<'a, Result<Post>>;
}

/// Predicate deciding whether a fetched post is kept.
pub trait PostFilter: Send + Sync {
    fn accept(&self, post: &Post) -> bool;
}

/// Drops pinned posts, recognised by a missing or unexpected marker query parameter.
#[derive(Debug, Clone)]
pub struct PinnedPostFilter {
    param: String,
    prefix: String,
}

impl PinnedPostFilter {
    pub fn new(param: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            prefix: prefix.into(),
        }
    }
}

impl From<&PinnedFilterConfig> for PinnedPostFilter {
    fn from(config: &PinnedFilterConfig) -> Self {
        Self::new(&config.param, &config.prefix)
    }
}

impl PostFilter for PinnedPostFilter {
    fn accept(&self, post: &Post) -> bool {
        let Ok(url) = Url::parse(&post.url) else {
            return false;
        };
        url.query_pairs()
            .find(|(key, _)| key == self.param.as_str())
            .is_some_and(|(_, value)| value.starts_with(self.prefix.as_str()))
    }
}

/// Drain a fetcher into a sample, stopping as soon as the cap is reached.
pub async fn collect_sample(
    fetcher: &dyn PostFetcher,
    request: &FetchRequest,
) -> Result<PostSample> {
    let mut sample = PostSample::new();
    if request.sample_count == 0 {
        return Ok(sample);
    }

    let mut posts = fetcher.fetch_posts(request);
    while let Some(post) = posts.next().await {
        let post = post?;
        log::debug!("Obtained post {}", post.id);
        sample.insert(post);
        if sample.len() >= request.sample_count {
            break;
        }
    }
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::stream;

    use super::*;
    use crate::error::AppError;

    fn post(id: &str, url: &str) -> Post {
        Post {
            id: id.to_string(),
            author: "a".to_string(),
            text: Some("t".to_string()),
            post_text: None,
            comments: 0,
            likes: None,
            url: url.to_string(),
            group: "g".to_string(),
        }
    }

    fn request(sample_count: usize) -> FetchRequest {
        FetchRequest {
            target: "g".to_string(),
            kind: TargetKind::Group,
            auth: Auth::Cookies("cookies.txt".into()),
            page_limit: None,
            sample_count,
        }
    }

    /// Yields `total` posts and counts how many were pulled.
    struct CountingFetcher {
        total: usize,
        pulled: AtomicUsize,
    }

    impl PostFetcher for CountingFetcher {
        fn fetch_posts<'a>(&'a self, _request: &'a FetchRequest) -> BoxStream<'a, Result<Post>> {
            stream::iter(0..self.total)
                .map(move |i| {
                    self.pulled.fetch_add(1, Ordering::SeqCst);
                    Ok(post(&i.to_string(), "https://example.com"))
                })
                .boxed()
        }
    }

    struct FailingFetcher;

    impl PostFetcher for FailingFetcher {
        fn fetch_posts<'a>(&'a self, _request: &'a FetchRequest) -> BoxStream<'a, Result<Post>> {
            stream::iter(vec![
                Ok(post("1", "https://example.com")),
                Err(AppError::TemporarilyBanned("slow down".into())),
            ])
            .boxed()
        }
    }

    #[tokio::test]
    async fn collect_stops_at_cap() {
        let fetcher = CountingFetcher {
            total: 100,
            pulled: AtomicUsize::new(0),
        };
        let sample = collect_sample(&fetcher, &request(3)).await.unwrap();
        assert_eq!(sample.ids().collect::<Vec<_>>(), vec!["0", "1", "2"]);
        assert_eq!(fetcher.pulled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn collect_returns_short_sample_when_provider_runs_dry() {
        let fetcher = CountingFetcher {
            total: 2,
            pulled: AtomicUsize::new(0),
        };
        let sample = collect_sample(&fetcher, &request(5)).await.unwrap();
        assert_eq!(sample.len(), 2);
    }

    #[tokio::test]
    async fn collect_propagates_stream_errors() {
        let err = collect_sample(&FailingFetcher, &request(5)).await.unwrap_err();
        assert!(err.is_transient_ban());
    }

    #[test]
    fn pinned_filter_keeps_marked_posts() {
        let filter = PinnedPostFilter::new("_ft_", "qid");
        assert!(filter.accept(&post("1", "https://m.example.com/groups/1?_ft_=qid.123&x=1")));
        assert!(!filter.accept(&post("2", "https://m.example.com/groups/1?_ft_=top_level")));
        assert!(!filter.accept(&post("3", "https://m.example.com/groups/1?x=1")));
        assert!(!filter.accept(&post("4", "not a url")));
    }
}
