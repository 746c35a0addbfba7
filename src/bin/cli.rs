//! groupwatch CLI
//!
//! Watches one group or page and sends a digest whenever new posts appear.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use groupwatch::{
    config::MonitorSettings,
    error::{AppError, Result},
    models::{Config, TargetKind},
    pipeline::{CycleRunner, PollScheduler, RetryPolicy},
    services::{FeedFetcher, HttpNotifier},
};

/// groupwatch - new post notifier
#[derive(Parser, Debug)]
#[command(
    name = "groupwatch",
    version,
    about = "Get notified about new posts in a group or page"
)]
struct Cli {
    /// Group or page id to watch
    #[arg(short = 'i', long = "id")]
    id: Option<String>,

    /// The id names a group (default)
    #[arg(long, conflicts_with = "page")]
    group: bool,

    /// The id names a page
    #[arg(long)]
    page: bool,

    /// Account username
    #[arg(short, long, env = "GROUPWATCH_USERNAME")]
    username: Option<String>,

    /// Account password
    #[arg(short, long, env = "GROUPWATCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Cookies file to authenticate with instead of a username and password
    #[arg(short, long)]
    cookies_file: Option<PathBuf>,

    /// User-Agent for feed requests
    #[arg(long)]
    user_agent: Option<String>,

    /// Number of recent posts to compare each check
    #[arg(short = 'n', long)]
    sample_count: Option<usize>,

    /// Check frequency, e.g. "45m" or "1h..2h"
    #[arg(short, long)]
    every: Option<String>,

    /// Notification URL, e.g. "mailgun://me@example.com/KEY" or "json://host/hook"
    #[arg(short = 'a', long, env = "GROUPWATCH_NOTIFY_URL")]
    notify_url: Option<String>,

    /// Base URL of the post feed service
    #[arg(long)]
    endpoint: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Also send a notification when a check fails
    #[arg(long)]
    include_errors: bool,
}

impl Cli {
    /// Overlay command-line values onto the file configuration.
    fn apply(self, config: &mut Config) {
        if let Some(id) = self.id {
            config.monitor.target = id;
        }
        if self.page {
            config.monitor.target_kind = TargetKind::Page;
        } else if self.group {
            config.monitor.target_kind = TargetKind::Group;
        }
        if let Some(username) = self.username {
            config.auth.username = Some(username);
        }
        if let Some(password) = self.password {
            config.auth.password = Some(password);
        }
        if let Some(path) = self.cookies_file {
            config.auth.cookies_file = Some(path);
        }
        if let Some(user_agent) = self.user_agent {
            config.fetch.user_agent = Some(user_agent);
        }
        if let Some(count) = self.sample_count {
            config.monitor.sample_count = count;
        }
        if let Some(every) = self.every {
            config.monitor.frequency = every;
        }
        if let Some(url) = self.notify_url {
            config.notify.url = url;
        }
        if let Some(endpoint) = self.endpoint {
            config.fetch.endpoint = endpoint;
        }
        if self.include_errors {
            config.monitor.include_errors = true;
        }
    }
}

/// Initialize logging from the verbosity flag or the configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    init_logging(cli.verbose, &config.logging.level);
    cli.apply(&mut config);

    let settings = MonitorSettings::from_config(&config).inspect_err(|e| {
        log::error!("{e}");
    })?;
    if !HttpNotifier::supports(&settings.notify_url) {
        return Err(AppError::config(format!(
            "Unsupported notification URL: {}",
            settings.notify_url
        )));
    }

    let fetcher = Arc::new(FeedFetcher::new(&config.fetch)?);
    let notifier = Arc::new(HttpNotifier::new(config.notify.timeout_secs)?);
    let runner = CycleRunner::new(
        settings,
        fetcher,
        notifier,
        RetryPolicy::from(&config.retry),
    );
    let mut scheduler = PollScheduler::new(runner);

    log::info!("groupwatch starting...");
    tokio::select! {
        result = scheduler.run() => {
            if let Err(e) = &result {
                log::error!("Stopping: {e}");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
