//! Source discovery: turn a campaign source into candidate article links.
//!
//! Two source shapes are supported:
//!
//! | Type | Module | Method |
//! |------|--------|--------|
//! | `RSS` | [`rss`] | RSS 2.0, RSS 1.0 or Atom feed |
//! | `DIRECT` | [`sitemap`] | sitemap URL, or well-known sitemap paths tried on the site |
//!
//! Discovery never fails loudly: any fetch or parse problem is logged and
//! yields an empty list, which the pipeline reports as "no candidates".

pub mod rss;
pub mod sitemap;

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::SourceType;
use crate::fetch::FetchText;
use crate::models::SourceCandidate;

use sitemap::Sitemap;

/// Prepend `https://` to a source URL written without a scheme.
pub fn normalize_source_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// `scheme://host[:port]` of a URL, `None` if it cannot be parsed.
pub fn site_origin(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// `scheme://host/`, the base URL article pages are resolved against.
pub fn site_base(url: &str) -> Option<String> {
    site_origin(url).map(|o| format!("{o}/"))
}

/// Discovers candidates through any [`FetchText`] transport.
#[derive(Debug)]
pub struct Discoverer<'a, F> {
    fetcher: &'a F,
    timeout: Duration,
}

impl<'a, F: FetchText> Discoverer<'a, F> {
    pub fn new(fetcher: &'a F, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Candidate links for a source, in source order, at most `max_items`.
    #[instrument(level = "info", skip_all, fields(%url, ?source_type))]
    pub async fn discover(
        &self,
        url: &str,
        source_type: SourceType,
        max_items: usize,
    ) -> Vec<SourceCandidate> {
        let url = normalize_source_url(url);
        let candidates = match source_type {
            SourceType::Rss => self.discover_feed(&url, max_items).await,
            SourceType::Direct => self.discover_sitemap(&url, max_items).await,
        };
        info!(count = candidates.len(), "Discovered candidates");
        candidates
    }

    async fn fetch_body(&self, url: &str) -> Option<String> {
        match self.fetcher.fetch_text(url, self.timeout).await {
            Ok(page) => Some(page.body),
            Err(e) => {
                warn!(error = %e, %url, "Source fetch failed");
                None
            }
        }
    }

    async fn discover_feed(&self, url: &str, max_items: usize) -> Vec<SourceCandidate> {
        let Some(body) = self.fetch_body(url).await else {
            return Vec::new();
        };
        match rss::parse_feed(&body, max_items, Utc::now()) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, %url, "Feed did not parse");
                Vec::new()
            }
        }
    }

    async fn discover_sitemap(&self, url: &str, max_items: usize) -> Vec<SourceCandidate> {
        let body = if sitemap::is_xml_url(url) {
            self.fetch_body(url).await
        } else {
            self.find_sitemap(url).await
        };
        let Some(body) = body else {
            return Vec::new();
        };

        let now = Utc::now();
        match sitemap::parse_sitemap(&body, max_items, now) {
            Ok(Sitemap::Leaf(items)) => items,
            Ok(Sitemap::Index(children)) => {
                let children = sitemap::filter_children(children);
                let Some(child) = sitemap::pick_child(&children) else {
                    warn!(%url, "Sitemap index has no entries");
                    return Vec::new();
                };
                info!(child = %child.loc, "Following child sitemap");
                let Some(child_body) = self.fetch_body(&child.loc).await else {
                    return Vec::new();
                };
                match sitemap::parse_sitemap(&child_body, max_items, now) {
                    Ok(Sitemap::Leaf(items)) => items,
                    Ok(Sitemap::Index(_)) => {
                        warn!(child = %child.loc, "Nested sitemap index is not followed");
                        Vec::new()
                    }
                    Err(e) => {
                        warn!(error = %e, child = %child.loc, "Child sitemap did not parse");
                        Vec::new()
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, %url, "Sitemap did not parse");
                Vec::new()
            }
        }
    }

    /// First well-known sitemap path on the site that answers with sitemap XML.
    async fn find_sitemap(&self, url: &str) -> Option<String> {
        let Some(origin) = site_origin(url) else {
            warn!(%url, "Cannot derive site origin for sitemap probing");
            return None;
        };
        for path in sitemap::WELL_KNOWN_PATHS {
            let candidate = format!("{origin}{path}");
            match self.fetcher.fetch_text(&candidate, self.timeout).await {
                Ok(page) if sitemap::looks_like_sitemap(&page.body) => {
                    info!(sitemap = %candidate, "Found sitemap");
                    return Some(page.body);
                }
                Ok(_) => debug!(sitemap = %candidate, "Not a sitemap"),
                Err(e) => debug!(error = %e, sitemap = %candidate, "Sitemap candidate failed"),
            }
        }
        warn!(%origin, "No sitemap found");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticFetcher;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://site.test/post-sitemap1.xml</loc><lastmod>2024-01-01</lastmod></sitemap>
  <sitemap><loc>https://site.test/post-sitemap2.xml</loc><lastmod>2024-02-01</lastmod></sitemap>
  <sitemap><loc>https://site.test/image-sitemap.xml</loc><lastmod>2024-03-01</lastmod></sitemap>
</sitemapindex>"#;

    const LEAF_TWO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://site.test/from-page-two/</loc><lastmod>2024-02-01</lastmod></url>
</urlset>"#;

    const LEAF_ONE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://site.test/from-page-one/</loc><lastmod>2024-01-01</lastmod></url>
</urlset>"#;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title>
<item><link>https://site.test/a?ref=rss</link><pubDate>Tue, 02 Jan 2024 10:00:00 +0000</pubDate></item>
</channel></rss>"#;

    #[test]
    fn test_normalize_source_url() {
        assert_eq!(normalize_source_url(" site.test/feed "), "https://site.test/feed");
        assert_eq!(normalize_source_url("http://site.test"), "http://site.test");
    }

    #[test]
    fn test_site_base() {
        assert_eq!(site_base("https://site.test/news/feed?x=1").as_deref(), Some("https://site.test/"));
        assert_eq!(site_base("http://site.test:8080/a").as_deref(), Some("http://site.test:8080/"));
        assert_eq!(site_base("not a url"), None);
    }

    #[tokio::test]
    async fn test_discover_rss_happy_path() {
        let fetcher = StaticFetcher::new().with_page("https://site.test/feed", FEED);
        let discoverer = Discoverer::new(&fetcher, Duration::from_secs(1));
        let items = discoverer.discover("site.test/feed", SourceType::Rss, 10).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://site.test/a");
    }

    #[tokio::test]
    async fn test_discover_direct_finds_and_follows_index() {
        let fetcher = StaticFetcher::new()
            .with_page("https://site.test/sitemap_index.xml", INDEX)
            .with_page("https://site.test/post-sitemap1.xml", LEAF_ONE)
            .with_page("https://site.test/post-sitemap2.xml", LEAF_TWO);
        let discoverer = Discoverer::new(&fetcher, Duration::from_secs(1));
        let items = discoverer
            .discover("https://site.test/blog/", SourceType::Direct, 10)
            .await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://site.test/from-page-two/");
    }

    #[tokio::test]
    async fn test_discover_direct_skips_non_sitemap_paths() {
        let fetcher = StaticFetcher::new()
            .with_page("https://site.test/sitemap_index.xml", "<html>this is a soft 404 page, definitely not xml</html>")
            .with_page("https://site.test/sitemap.xml", LEAF_ONE);
        let discoverer = Discoverer::new(&fetcher, Duration::from_secs(1));
        let items = discoverer.discover("https://site.test", SourceType::Direct, 10).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://site.test/from-page-one/");
    }

    #[tokio::test]
    async fn test_discover_failure_is_empty() {
        let fetcher = StaticFetcher::new();
        let discoverer = Discoverer::new(&fetcher, Duration::from_secs(1));
        assert!(discoverer.discover("https://site.test/feed", SourceType::Rss, 10).await.is_empty());
        assert!(discoverer.discover("https://site.test/", SourceType::Direct, 10).await.is_empty());
    }
}
