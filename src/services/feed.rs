// src/services/feed.rs

//! HTTP post feed fetcher.
//!
//! Talks to a post feed service that exposes a target's recent posts as
//! paged JSON:
//!
//! ```text
//! GET {endpoint}/targets/{target}/posts?kind=group&page=1&per_page=5
//! {"posts": [...], "next_page": 2}
//! ```
//!
//! Pages are requested lazily, so a consumer that stops early never triggers
//! further requests.

use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt, future};
use reqwest::header::{COOKIE, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Auth, FetchConfig, Post, cookie_header};
use crate::services::fetcher::{FetchRequest, PinnedPostFilter, PostFetcher, PostFilter};

/// Default User-Agent for feed requests.
const DEFAULT_USER_AGENT: &str = concat!("groupwatch/", env!("CARGO_PKG_VERSION"));

/// One page of the feed.
#[derive(Debug, Deserialize)]
struct FeedPage {
    #[serde(default)]
    posts: Vec<Post>,
    #[serde(default)]
    next_page: Option<u32>,
}

/// Paging position inside one fetch.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    next: Option<u32>,
    fetched: u32,
}

/// Fetcher backed by the HTTP post feed service.
pub struct FeedFetcher {
    client: Client,
    endpoint: Url,
    filter: Option<Box<dyn PostFilter>>,
}

impl FeedFetcher {
    /// Create a fetcher from feed settings, including the optional pinned-post filter.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let filter = config
            .pinned_filter
            .as_ref()
            .map(|f| Box::new(PinnedPostFilter::from(f)) as Box<dyn PostFilter>);

        Ok(Self {
            client,
            endpoint: Url::parse(&config.endpoint)?,
            filter,
        })
    }

    /// Replace the post filter.
    pub fn with_filter(mut self, filter: impl PostFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    fn page_url(&self, target: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config(format!("Invalid feed endpoint: {}", self.endpoint)))?
            .pop_if_empty()
            .extend(["targets", target, "posts"]);
        Ok(url)
    }

    async fn cookie_value(path: &std::path::Path) -> Result<HeaderValue> {
        let content = tokio::fs::read_to_string(path).await?;
        let joined = cookie_header(&content);
        if joined.is_empty() {
            return Err(AppError::config(format!(
                "Cookies file {} is empty",
                path.display()
            )));
        }
        HeaderValue::from_str(&joined).map_err(|e| {
            AppError::config(format!("Cookies file {} is unusable: {}", path.display(), e))
        })
    }

    async fn fetch_page(&self, request: &FetchRequest, page: u32) -> Result<FeedPage> {
        let url = self.page_url(&request.target)?;
        let builder = self.client.get(url).query(&[
            ("kind", request.kind.as_str().to_string()),
            ("page", page.to_string()),
            ("per_page", request.sample_count.to_string()),
        ]);
        let builder = match &request.auth {
            Auth::Credentials { username, password } => {
                builder.basic_auth(username, Some(password))
            }
            Auth::Cookies(path) => builder.header(COOKIE, Self::cookie_value(path).await?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let context = format!("{} page {}", request.target, page);
        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(AppError::TemporarilyBanned(format!(
                "{context}: provider returned {status}"
            ))),
            StatusCode::FORBIDDEN | StatusCode::LOCKED => Err(AppError::AccountDisabled(format!(
                "{context}: provider returned {status}"
            ))),
            s if !s.is_success() => Err(AppError::fetch(context, format!("status {s}"))),
            _ => Ok(response.json::<FeedPage>().await?),
        }
    }
}

impl PostFetcher for FeedFetcher {
    fn fetch_posts<'a>(&'a self, request: &'a FetchRequest) -> BoxStream<'a, Result<Post>> {
        let start = Cursor {
            next: Some(1),
            fetched: 0,
        };
        let filter = self.filter.as_deref();

        stream::try_unfold(start, move |cursor| async move {
            let Some(page) = cursor.next else {
                return Ok(None);
            };
            if request.page_limit.is_some_and(|limit| cursor.fetched >= limit) {
                return Ok(None);
            }

            let feed_page = self.fetch_page(request, page).await?;
            log::debug!(
                "Fetched page {} of {} ({} posts)",
                page,
                request.target,
                feed_page.posts.len()
            );
            let next = Cursor {
                next: feed_page.next_page,
                fetched: cursor.fetched + 1,
            };
            Ok::<_, AppError>(Some((feed_page.posts, next)))
        })
        .map_ok(|posts| stream::iter(posts.into_iter().map(Ok::<Post, AppError>)))
        .try_flatten()
        .try_filter(move |post| {
            let keep = filter.is_none_or(|f| f.accept(post));
            if !keep {
                log::debug!("Skipping filtered post {}", post.id);
            }
            future::ready(keep)
        })
        .boxed()
    }
}
