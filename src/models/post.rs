//! Post data structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A post fetched from the monitored group or page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Provider-unique identifier
    #[serde(alias = "post_id")]
    pub id: String,

    /// Author display name
    #[serde(default, alias = "username")]
    pub author: String,

    /// Primary body text
    #[serde(default)]
    pub text: Option<String>,

    /// Fallback body text, used when `text` is empty
    #[serde(default)]
    pub post_text: Option<String>,

    /// Number of comments
    #[serde(default)]
    pub comments: u64,

    /// Number of likes, when the provider exposes it
    #[serde(default)]
    pub likes: Option<u64>,

    /// Canonical URL to the post
    #[serde(default, alias = "post_url")]
    pub url: String,

    /// Name of the owning group or page
    #[serde(default)]
    pub group: String,
}

impl Post {
    /// Body text to show, preferring the primary field.
    pub fn display_text(&self) -> &str {
        [self.text.as_deref(), self.post_text.as_deref()]
            .into_iter()
            .flatten()
            .find(|t| !t.trim().is_empty())
            .unwrap_or("")
    }
}

/// Posts gathered by one fetch cycle, keyed by id, in provider order.
#[derive(Debug, Clone, Default)]
pub struct PostSample {
    posts: Vec<Post>,
    index: HashMap<String, usize>,
}

impl PostSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a post. A repeated id keeps its first position but takes the newer value.
    pub fn insert(&mut self, post: Post) {
        match self.index.get(&post.id) {
            Some(&pos) => self.posts[pos] = post,
            None => {
                self.index.insert(post.id.clone(), self.posts.len());
                self.posts.push(post);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Post> {
        self.index.get(id).map(|&pos| &self.posts[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Post ids in provider order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.posts.iter().map(|p| p.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl FromIterator<Post> for PostSample {
    fn from_iter<I: IntoIterator<Item = Post>>(iter: I) -> Self {
        let mut sample = PostSample::new();
        for post in iter {
            sample.insert(post);
        }
        sample
    }
}
