//! Publishing finished articles.
//!
//! The pipeline hands every [`ArticleRecord`] to a [`Publisher`] and asks it
//! for recent posts to build the internal-linking context of the next
//! prompt.
//!
//! # Submodules
//!
//! - [`json`]: Writes each article to its own JSON file
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── {campaign_id}/
//!     ├── 20250506T083000-some-title.json
//!     └── 20250506T120000-another-title.json
//! ```

pub mod json;

use crate::error::PublishError;
use crate::models::ArticleRecord;

pub use json::JsonPublisher;

const NO_POSTS: &str = "No existing posts available.";

/// An already published post, as offered for internal linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub title: String,
    pub url: String,
}

pub trait Publisher {
    /// Publish an article and return a reference to it (URL, path or id).
    async fn publish(&self, article: &ArticleRecord) -> Result<String, PublishError>;

    /// Most recent published posts, newest first.
    async fn recent_posts(&self, limit: usize) -> Result<Vec<PublishedPost>, PublishError>;
}

/// Render posts as `- {title} ({url})` lines.
pub fn linking_context(posts: &[PublishedPost]) -> String {
    if posts.is_empty() {
        return NO_POSTS.to_string();
    }
    posts
        .iter()
        .map(|p| format!("- {} ({})", p.title, p.url))
        .collect::<Vec<_>>()
        .join("\n")
}
