//! Digest formatting for new posts.

use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::models::{DestinationKind, Post, PostSample};
use crate::pipeline::detect::Delta;

/// Notification payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub title: String,
    pub body: String,
}

/// Builds digests for one destination kind.
#[derive(Debug, Clone)]
pub struct DigestBuilder {
    kind: DestinationKind,
    /// Used in titles when no new post names its group
    fallback_group: String,
}

impl DigestBuilder {
    pub fn new(kind: DestinationKind, fallback_group: impl Into<String>) -> Self {
        Self {
            kind,
            fallback_group: fallback_group.into(),
        }
    }

    /// Digest for the posts in `delta`, stamped with the current local time.
    pub fn build(&self, delta: &Delta, sample: &PostSample) -> Digest {
        self.build_at(delta, sample, Local::now())
    }

    pub fn build_at(&self, delta: &Delta, sample: &PostSample, now: DateTime<Local>) -> Digest {
        let posts: Vec<&Post> = delta.iter().filter_map(|id| sample.get(id)).collect();

        let group = posts
            .iter()
            .map(|p| p.group.trim())
            .find(|g| !g.is_empty())
            .unwrap_or(&self.fallback_group);
        let title = format!("{} new post(s) from {}", delta.len(), group);

        let body = match self.kind {
            DestinationKind::Html => render_html(&posts),
            DestinationKind::Plain => found_at(now),
        };
        Digest { title, body }
    }

    /// Digest reporting a failed cycle.
    pub fn build_error(&self, target: &str, error: &dyn std::fmt::Display) -> Digest {
        let title = format!("Failed to check {target} for new posts");
        let body = match self.kind {
            DestinationKind::Html => format!(
                "<!DOCTYPE html>\n<html>\n<body>\n<p>{}</p>\n<p>{}</p>\n</body>\n</html>\n",
                html_escape(&error.to_string()),
                html_escape(&found_at(Local::now()))
            ),
            DestinationKind::Plain => format!("{}\n{}", error, found_at(Local::now())),
        };
        Digest { title, body }
    }
}

fn found_at(now: DateTime<Local>) -> String {
    format!("Found at {}", now.format("%Y-%m-%d %H:%M:%S"))
}

fn render_html(posts: &[&Post]) -> String {
    let mut entries = String::new();
    for post in posts {
        let likes = post
            .likes
            .map_or_else(|| "-".to_string(), |l| l.to_string());
        let _ = write!(
            entries,
            r#"
        <div style="text-align:center;">
            <h3>{author}</h3>
            <p style="font-size: 1.2rem;">{text}</p>
            <p>{comments} comments</p>
            <p>{likes} likes</p>
            <a href="{url}">Read more</a>
        </div><br><br>
"#,
            author = html_escape(&post.author),
            text = html_escape(post.display_text()),
            comments = post.comments,
            likes = likes,
            url = html_escape(&post.url),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<body>
    <div>{entries}    </div>
</body>
</html>
"#
    )
}

/// Escape text for HTML element content and quoted attributes.
fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
