// src/pipeline/cycle.rs

//! One poll cycle: fetch, detect, digest, notify.

use std::fmt;
use std::sync::Arc;

use crate::config::MonitorSettings;
use crate::error::{AppError, Result};
use crate::pipeline::detect::{SeenState, detect};
use crate::pipeline::digest::DigestBuilder;
use crate::pipeline::retry::{FetchOutcome, RetryPolicy};
use crate::services::{Notifier, PostFetcher};

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// First sample adopted, nothing sent
    Baseline { posts: usize },
    /// No new posts
    Unchanged { posts: usize },
    /// Provider returned nothing; state kept
    Empty,
    /// Digest sent for this many new posts
    Notified { new_posts: usize },
    /// Fetch failed; the next cycle runs as usual
    Aborted { reason: String },
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline { posts } => write!(f, "baseline of {posts} posts"),
            Self::Unchanged { posts } => write!(f, "no new posts among {posts}"),
            Self::Empty => write!(f, "empty sample"),
            Self::Notified { new_posts } => write!(f, "notified {new_posts} new posts"),
            Self::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}

/// Runs cycles against fixed collaborators.
pub struct CycleRunner {
    settings: MonitorSettings,
    fetcher: Arc<dyn PostFetcher>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    digests: DigestBuilder,
}

impl CycleRunner {
    pub fn new(
        settings: MonitorSettings,
        fetcher: Arc<dyn PostFetcher>,
        notifier: Arc<dyn Notifier>,
        retry: RetryPolicy,
    ) -> Self {
        let digests = DigestBuilder::new(settings.destination, settings.target.clone());
        Self {
            settings,
            fetcher,
            notifier,
            retry,
            digests,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Run one cycle, advancing `state`.
    ///
    /// Returns `Err` when the account is disabled or a notification cannot be
    /// delivered. A disabled account is returned even if reporting it fails. Other fetch failures end the cycle as [`CycleOutcome::Aborted`].
    pub async fn run(&self, state: &mut SeenState) -> Result<CycleOutcome> {
        let target = &self.settings.target;
        let request = self.settings.fetch_request();

        let sample = match self.retry.fetch(self.fetcher.as_ref(), &request).await {
            Ok(FetchOutcome::Success(sample)) => sample,
            Ok(FetchOutcome::TransientFailure { attempts, error }) => {
                log::error!("Giving up on {target} after {attempts} attempts: {error}");
                return self.abort(error).await;
            }
            Ok(FetchOutcome::PermanentFailure { error }) => {
                // A failed report must not mask the ban
                if let Err(e) = self.report(&error).await {
                    log::error!("Could not report disabled account: {e}");
                }
                return Err(error);
            }
            Err(error) => {
                log::error!("Fetching {target} failed: {error}");
                return self.abort(error).await;
            }
        };

        if sample.is_empty() {
            log::warn!("No posts obtained from {target}");
            return Ok(CycleOutcome::Empty);
        }

        let first = !state.is_set();
        let delta = detect(&sample, state);
        if delta.is_empty() {
            return Ok(if first {
                log::info!("Recorded {} posts as the baseline", sample.len());
                CycleOutcome::Baseline {
                    posts: sample.len(),
                }
            } else {
                log::info!("No new posts");
                CycleOutcome::Unchanged {
                    posts: sample.len(),
                }
            });
        }

        log::info!("Found {} new posts", delta.len());
        let digest = self.digests.build(&delta, &sample);
        log::info!("Sending notification: {}", digest.title);
        self.notifier
            .send(&self.settings.notify_url, &digest.title, &digest.body)
            .await?;

        Ok(CycleOutcome::Notified {
            new_posts: delta.len(),
        })
    }

    async fn abort(&self, error: AppError) -> Result<CycleOutcome> {
        self.report(&error).await?;
        Ok(CycleOutcome::Aborted {
            reason: error.to_string(),
        })
    }

    /// Send an error digest when error reporting is enabled.
    async fn report(&self, error: &AppError) -> Result<()> {
        if !self.settings.include_errors {
            return Ok(());
        }
        let digest = self.digests.build_error(&self.settings.target, error);
        log::info!("Sending error notification: {}", digest.title);
        self.notifier
            .send(&self.settings.notify_url, &digest.title, &digest.body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::StreamExt;
    use futures::stream::{self, BoxStream};

    use super::*;
    use crate::models::{Auth, DestinationKind, FrequencySpec, Post, TargetKind, TimeUnit};
    use crate::services::FetchRequest;

    /// Plays one scripted result per call: a page of ids or an error.
    struct PagedFetcher {
        pages: Mutex<Vec<std::result::Result<Vec<&'static str>, AppError>>>,
    }

    impl PagedFetcher {
        fn new(pages: Vec<std::result::Result<Vec<&'static str>, AppError>>) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages),
            })
        }
    }

    impl PostFetcher for PagedFetcher {
        fn fetch_posts<'a>(&'a self, _request: &'a FetchRequest) -> BoxStream<'a, Result<Post>> {
            let mut pages = self.pages.lock().unwrap();
            let items: Vec<Result<Post>> = match pages.remove(0) {
                Ok(ids) => ids
                    .into_iter()
                    .map(|id| {
                        Ok(Post {
                            id: id.into(),
                            author: "a".into(),
                            text: Some("t".into()),
                            post_text: None,
                            comments: 1,
                            likes: Some(2),
                            url: format!("https://example.com/{id}"),
                            group: "Group".into(),
                        })
                    })
                    .collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items).boxed()
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, _url: &str, title: &str, body: &str) -> Result<()> {
            if self.fail {
                return Err(AppError::notification("json", "destination returned 500"));
            }
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn settings(include_errors: bool) -> MonitorSettings {
        MonitorSettings {
            target: "42".into(),
            target_kind: TargetKind::Group,
            auth: Auth::Cookies("cookies.txt".into()),
            frequency: FrequencySpec::Fixed(1, TimeUnit::Hour),
            sample_count: 5,
            page_limit: None,
            include_errors,
            destination: DestinationKind::Plain,
            notify_url: "json://localhost/hook".into(),
        }
    }

    fn runner(
        fetcher: Arc<PagedFetcher>,
        notifier: Arc<RecordingNotifier>,
        include_errors: bool,
    ) -> CycleRunner {
        CycleRunner::new(
            settings(include_errors),
            fetcher,
            notifier,
            RetryPolicy::new(1, vec![]),
        )
    }

    #[tokio::test]
    async fn baseline_then_notify() {
        let fetcher = PagedFetcher::new(vec![Ok(vec!["A", "B"]), Ok(vec!["C", "A", "B"])]);
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(fetcher, notifier.clone(), false);
        let mut state = SeenState::new();

        assert_eq!(
            runner.run(&mut state).await.unwrap(),
            CycleOutcome::Baseline { posts: 2 }
        );
        assert!(notifier.sent.lock().unwrap().is_empty());

        assert_eq!(
            runner.run(&mut state).await.unwrap(),
            CycleOutcome::Notified { new_posts: 1 }
        );
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "1 new post(s) from Group");
        assert!(sent[0].1.starts_with("Found at "));
    }

    #[tokio::test]
    async fn empty_sample_keeps_state() {
        let fetcher = PagedFetcher::new(vec![Ok(vec!["A"]), Ok(vec![]), Ok(vec!["A"])]);
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(fetcher, notifier.clone(), false);
        let mut state = SeenState::new();

        runner.run(&mut state).await.unwrap();
        assert_eq!(runner.run(&mut state).await.unwrap(), CycleOutcome::Empty);
        assert_eq!(
            runner.run(&mut state).await.unwrap(),
            CycleOutcome::Unchanged { posts: 1 }
        );
        assert!(state.contains("A"));
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_exhaustion_aborts_cycle_only() {
        let fetcher = PagedFetcher::new(vec![Err(AppError::TemporarilyBanned("429".into()))]);
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(fetcher, notifier.clone(), false);

        let outcome = runner.run(&mut SeenState::new()).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Aborted { .. }));
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn errors_are_reported_when_enabled() {
        let fetcher = PagedFetcher::new(vec![Err(AppError::fetch("42", "status 500"))]);
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(fetcher, notifier.clone(), true);

        let outcome = runner.run(&mut SeenState::new()).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Aborted { .. }));

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Failed to check 42 for new posts");
        assert!(sent[0].1.contains("status 500"));
    }

    #[tokio::test]
    async fn permanent_ban_is_fatal() {
        let fetcher = PagedFetcher::new(vec![Err(AppError::AccountDisabled("gone".into()))]);
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(fetcher, notifier.clone(), true);

        let err = runner.run(&mut SeenState::new()).await.unwrap_err();
        assert!(err.is_permanent_ban());
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn permanent_ban_survives_failed_report() {
        let fetcher = PagedFetcher::new(vec![Err(AppError::AccountDisabled("gone".into()))]);
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let runner = runner(fetcher, notifier, true);

        let err = runner.run(&mut SeenState::new()).await.unwrap_err();
        assert!(err.is_permanent_ban());
    }

    #[tokio::test]
    async fn notification_failure_propagates() {
        let fetcher = PagedFetcher::new(vec![Ok(vec!["A"]), Ok(vec!["B"])]);
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let runner = runner(fetcher, notifier, false);
        let mut state = SeenState::new();

        runner.run(&mut state).await.unwrap();
        let err = runner.run(&mut state).await.unwrap_err();
        assert!(matches!(err, AppError::Notification { .. }));
        // The delta was consumed; B is not reported again
        assert!(state.contains("B"));
    }
}
