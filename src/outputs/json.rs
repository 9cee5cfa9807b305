//! JSON file publisher.
//!
//! Each article is serialized to its own file, grouped by campaign:
//! ```text
//! output_dir/
//! └── tech-news/
//!     └── 20250506T083000-learn-rust.json
//! ```
//!
//! The same tree is read back to answer [`Publisher::recent_posts`]; only
//! articles with status `publish` are offered for linking.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};

use super::{PublishedPost, Publisher};
use crate::config::PostStatus;
use crate::error::PublishError;
use crate::models::ArticleRecord;
use crate::utils::slugify_title;

#[derive(Debug, Clone)]
pub struct JsonPublisher {
    output_dir: PathBuf,
}

impl JsonPublisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// File an article is written to.
    ///
    /// # Output Path
    ///
    /// `{output_dir}/{campaign_id}/{YYYYmmddTHHMMSS}-{slug}.json`, the slug
    /// coming from the SEO fields, then the title, then `article`. Publishing
    /// never overwrites: a taken name gets a `-2`, `-3`, ... suffix.
    pub fn path_for(&self, article: &ArticleRecord) -> PathBuf {
        let slug = [article.slug.as_str(), article.title.as_str()]
            .into_iter()
            .map(slugify_title)
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| "article".to_string());
        let stamp = article.created_at.format("%Y%m%dT%H%M%S");
        self.output_dir
            .join(slugify_title(&article.campaign_id))
            .join(format!("{stamp}-{slug}.json"))
    }

    /// `path` itself, or `stem-2.json`, `stem-3.json`, ... for later attempts.
    fn numbered(path: &Path, attempt: usize) -> PathBuf {
        if attempt <= 1 {
            return path.to_path_buf();
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("article");
        path.with_file_name(format!("{stem}-{attempt}.json"))
    }

    /// Write `content` to a file that did not exist before.
    async fn write_new(path: &Path, content: &[u8]) -> std::io::Result<PathBuf> {
        let mut attempt = 1;
        loop {
            let candidate = Self::numbered(path, attempt);
            match OpenOptions::new().write(true).create_new(true).open(&candidate).await {
                Ok(mut file) => {
                    file.write_all(content).await?;
                    file.flush().await?;
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %candidate.display(), "Article file exists, trying next name");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn read_article(path: &Path) -> Option<ArticleRecord> {
        let content = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable article file");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(article) => Some(article),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed article file");
                None
            }
        }
    }
}

impl Publisher for JsonPublisher {
    #[instrument(level = "info", skip_all, fields(campaign = %article.campaign_id))]
    async fn publish(&self, article: &ArticleRecord) -> Result<String, PublishError> {
        let json = serde_json::to_string_pretty(article)?;
        let path = self.path_for(article);

        if let Some(dir) = path.parent() {
            if let Err(e) = fs::create_dir_all(dir).await {
                error!(dir = %dir.display(), error = %e, "Failed to create output dir");
                return Err(e.into());
            }
        }

        let path = Self::write_new(&path, json.as_bytes()).await?;
        info!(path = %path.display(), "Wrote article JSON");
        Ok(path.display().to_string())
    }

    #[instrument(level = "info", skip_all, fields(limit = limit))]
    async fn recent_posts(&self, limit: usize) -> Result<Vec<PublishedPost>, PublishError> {
        if limit == 0 || !fs::try_exists(&self.output_dir).await? {
            return Ok(Vec::new());
        }

        let mut found: Vec<(ArticleRecord, PathBuf)> = Vec::new();
        let mut campaigns = fs::read_dir(&self.output_dir).await?;
        while let Some(campaign_dir) = campaigns.next_entry().await? {
            if !campaign_dir.file_type().await?.is_dir() {
                continue;
            }
            let mut files = fs::read_dir(campaign_dir.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(article) = Self::read_article(&path).await {
                    if article.status == PostStatus::Publish {
                        found.push((article, path));
                    }
                }
            }
        }

        found.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));
        let posts: Vec<PublishedPost> = found
            .into_iter()
            .take(limit)
            .map(|(article, path)| PublishedPost {
                title: article.title,
                url: path.display().to_string(),
            })
            .collect();
        debug!(count = posts.len(), "Collected recent posts");
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingMode;
    use chrono::{TimeZone, Utc};

    fn article(title: &str, status: PostStatus, minute: u32) -> ArticleRecord {
        ArticleRecord {
            campaign_id: "tech".to_string(),
            source_url: format!("https://x.test/{minute}"),
            title: title.to_string(),
            content_html: "<p>body</p>".to_string(),
            image_url: None,
            slug: String::new(),
            status,
            seo: None,
            processing_mode: ProcessingMode::AsIs,
            created_at: Utc.with_ymd_and_hms(2025, 5, 6, 8, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_path_for_uses_slug_then_title() {
        let publisher = JsonPublisher::new("/out");
        let mut a = article("Hello World!", PostStatus::Draft, 30);
        assert_eq!(
            publisher.path_for(&a),
            PathBuf::from("/out/tech/20250506T083000-hello-world.json")
        );
        a.slug = "custom-slug".to_string();
        assert!(publisher.path_for(&a).ends_with("20250506T083000-custom-slug.json"));
        a.slug.clear();
        a.title = "???".to_string();
        assert!(publisher.path_for(&a).ends_with("20250506T083000-article.json"));
    }

    #[tokio::test]
    async fn test_publish_and_recent_posts() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = JsonPublisher::new(dir.path());

        assert!(publisher.recent_posts(5).await.unwrap().is_empty());

        let first = publisher.publish(&article("Older", PostStatus::Publish, 1)).await.unwrap();
        publisher.publish(&article("Newer", PostStatus::Publish, 2)).await.unwrap();
        publisher.publish(&article("Draft", PostStatus::Draft, 3)).await.unwrap();
        assert!(first.ends_with("20250506T080100-older.json"));

        let written: ArticleRecord =
            serde_json::from_str(&std::fs::read_to_string(&first).unwrap()).unwrap();
        assert_eq!(written.title, "Older");

        let posts = publisher.recent_posts(5).await.unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Newer", "Older"]);
        assert_eq!(publisher.recent_posts(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_colliding_names_get_numbered() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = JsonPublisher::new(dir.path());
        let mut a = article("First", PostStatus::Publish, 5);
        a.slug = "same-slug".to_string();
        let mut b = article("Second", PostStatus::Publish, 5);
        b.slug = "same-slug".to_string();

        let ref_a = publisher.publish(&a).await.unwrap();
        let ref_b = publisher.publish(&b).await.unwrap();
        let ref_c = publisher.publish(&a).await.unwrap();
        assert_ne!(ref_a, ref_b);
        assert!(ref_a.ends_with("20250506T080500-same-slug.json"));
        assert!(ref_b.ends_with("20250506T080500-same-slug-2.json"));
        assert!(ref_c.ends_with("20250506T080500-same-slug-3.json"));

        let first: ArticleRecord = serde_json::from_str(&std::fs::read_to_string(&ref_a).unwrap()).unwrap();
        let second: ArticleRecord = serde_json::from_str(&std::fs::read_to_string(&ref_b).unwrap()).unwrap();
        assert_eq!(first.title, "First");
        assert_eq!(second.title, "Second");
        assert_eq!(std::fs::read_dir(dir.path().join("tech")).unwrap().count(), 3);
    }
}
