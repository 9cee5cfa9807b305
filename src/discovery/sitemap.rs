//! Sitemap index and leaf parsing, plus child-sitemap ranking.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::de::{DeError, from_str};
use regex::Regex;
use serde::Deserialize;

use crate::models::SourceCandidate;
use crate::utils::parse_timestamp;

/// Well-known sitemap locations tried when the source is a plain site URL.
pub const WELL_KNOWN_PATHS: [&str; 5] = [
    "/sitemap_index.xml",
    "/sitemap.xml",
    "/wp-sitemap.xml",
    "/post-sitemap.xml",
    "/sitemap_posts.xml",
];

const WANTED_MARKERS: [&str; 3] = ["post", "news", "article"];
const UNWANTED_MARKERS: [&str; 5] = ["image", "video", "author", "tag", "category"];

static XML_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.xml($|\?)").unwrap());
static SEQUENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\.xml$").unwrap());

#[derive(Debug, Default, Deserialize)]
struct SitemapDocument {
    #[serde(rename = "sitemap", default)]
    sitemaps: Vec<SitemapEntry>,
    #[serde(rename = "url", default)]
    urls: Vec<SitemapEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct SitemapEntry {
    #[serde(default)]
    loc: String,
    #[serde(default)]
    lastmod: Option<String>,
}

/// A `<sitemap>` entry of an index document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSitemap {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
}

impl ChildSitemap {
    fn lastmod_ts(&self) -> i64 {
        self.lastmod.map(|d| d.timestamp()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sitemap {
    Index(Vec<ChildSitemap>),
    Leaf(Vec<SourceCandidate>),
}

/// Whether a URL points straight at an XML document.
pub fn is_xml_url(url: &str) -> bool {
    XML_URL.is_match(url)
}

/// Whether a fetched body looks like any kind of sitemap.
pub fn looks_like_sitemap(body: &str) -> bool {
    body.contains("<sitemap") || body.contains("<url")
}

/// Parse either flavour of sitemap.
///
/// Leaf entries get `lastmod` (or `now` when absent); at most `max_items`
/// are returned.
pub fn parse_sitemap(xml: &str, max_items: usize, now: DateTime<Utc>) -> Result<Sitemap, DeError> {
    let doc: SitemapDocument = from_str(xml)?;
    if !doc.sitemaps.is_empty() {
        let children = doc
            .sitemaps
            .into_iter()
            .map(|s| ChildSitemap {
                loc: s.loc.trim().to_string(),
                lastmod: s.lastmod.as_deref().and_then(parse_timestamp),
            })
            .collect();
        return Ok(Sitemap::Index(children));
    }

    let items = doc
        .urls
        .into_iter()
        .take(max_items)
        .map(|u| {
            let published_at = match u.lastmod.as_deref().map(str::trim) {
                Some(raw) if !raw.is_empty() => parse_timestamp(raw),
                _ => Some(now),
            };
            SourceCandidate::new(u.loc.trim(), published_at)
        })
        .collect();
    Ok(Sitemap::Leaf(items))
}

/// Numeric filename suffix of a child sitemap, `-1` when it has none.
///
/// `post-sitemap.xml` is the first page of a numbered series and counts as 1.
pub fn sitemap_sequence(loc: &str) -> i64 {
    if let Some(n) = SEQUENCE
        .captures(loc)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
    {
        return n;
    }
    if loc.contains("post-sitemap.xml") { 1 } else { -1 }
}

/// Keep post/news/article sitemaps that are not media or taxonomy ones.
/// Falls back to everything when nothing qualifies.
pub fn filter_children(children: Vec<ChildSitemap>) -> Vec<ChildSitemap> {
    let wanted: Vec<ChildSitemap> = children
        .iter()
        .filter(|c| {
            let loc = c.loc.to_lowercase();
            WANTED_MARKERS.iter().any(|m| loc.contains(m))
                && !UNWANTED_MARKERS.iter().any(|m| loc.contains(m))
        })
        .cloned()
        .collect();
    if wanted.is_empty() { children } else { wanted }
}

/// Ordering between two child sitemaps: `Less` means `a` is preferred.
///
/// Higher sequence number wins when both have one and they differ,
/// otherwise the more recent `lastmod` wins.
pub fn compare_children(a: &ChildSitemap, b: &ChildSitemap) -> Ordering {
    let (sa, sb) = (sitemap_sequence(&a.loc), sitemap_sequence(&b.loc));
    if sa > -1 && sb > -1 && sa != sb {
        return sb.cmp(&sa);
    }
    b.lastmod_ts().cmp(&a.lastmod_ts())
}

/// The child sitemap to read next.
///
/// [`compare_children`] mixes two keys and is not a total order, so this is
/// a single pass keeping the first entry nothing else beats.
pub fn pick_child(children: &[ChildSitemap]) -> Option<&ChildSitemap> {
    children.iter().fold(None, |best, c| match best {
        Some(b) if compare_children(c, b) != Ordering::Less => Some(b),
        _ => Some(c),
    })
}
