//! Generic article scraper.
//!
//! Works on arbitrary news/blog HTML: boilerplate is detached from the DOM,
//! then title, lead image and main content are picked with the rule tables
//! from [`super::rules`].

use std::time::Duration;

use chrono::Utc;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::rules::{Matcher, ScraperRules};
use crate::error::ScrapeRejection;
use crate::fetch::FetchText;
use crate::models::ScrapedArticle;
use crate::utils::{collapse_whitespace, strip_tags};

static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());
static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());

/// Fetches article pages and extracts them.
#[derive(Debug)]
pub struct ArticleScraper<'a, F> {
    fetcher: &'a F,
    rules: &'a ScraperRules,
    timeout: Duration,
}

impl<'a, F: FetchText> ArticleScraper<'a, F> {
    pub fn new(fetcher: &'a F, rules: &'a ScraperRules, timeout: Duration) -> Self {
        Self {
            fetcher,
            rules,
            timeout,
        }
    }

    /// Fetch and extract one article.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Site root used to resolve relative image URLs
    /// * `article_url` - Page to scrape
    ///
    /// # Returns
    ///
    /// `None` when the fetch fails or the page is rejected; the reason is logged.
    #[instrument(level = "info", skip_all, fields(url = %article_url))]
    pub async fn scrape(&self, base_url: &str, article_url: &str) -> Option<ScrapedArticle> {
        let page = match self.fetcher.fetch_text(article_url, self.timeout).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Article fetch failed");
                return None;
            }
        };

        match extract_article(&page.body, base_url, article_url, self.rules) {
            Ok(article) => {
                info!(
                    title = %article.title,
                    bytes = article.content_html.len(),
                    has_image = article.image_url.is_some(),
                    suspected_block = page.suspected_block,
                    "Scraped article"
                );
                Some(article)
            }
            Err(reason) => {
                warn!(%reason, suspected_block = page.suspected_block, "Article rejected");
                None
            }
        }
    }
}

/// Extract title, content and image from a fetched page.
///
/// # Errors
///
/// A [`ScrapeRejection`] when the title is missing, the content is too short
/// or the page is a block/challenge page.
pub fn extract_article(
    html: &str,
    base_url: &str,
    article_url: &str,
    rules: &ScraperRules,
) -> Result<ScrapedArticle, ScrapeRejection> {
    let mut document = Html::parse_document(html);
    detach_matching(&mut document, &rules.strip_matchers());
    detach_matching(&mut document, &rules.boilerplate_matchers());

    let title = first_text(&document, &H1)
        .or_else(|| first_text(&document, &TITLE))
        .unwrap_or_default();

    let image_url = og_image(&document)
        .or_else(|| container_image(&document, &rules.image_matchers()))
        .and_then(|src| absolutize_url(base_url, &src));

    let content_html = main_content(&document, rules);

    if title.is_empty() {
        return Err(ScrapeRejection::MissingTitle);
    }
    let text = strip_tags(&content_html);
    let text_len = text.chars().count();
    if text_len < rules.min_content_chars {
        return Err(ScrapeRejection::ContentTooShort(text_len));
    }
    // Matched against the extracted title and text, never the raw markup.
    let haystack = format!("{title} {text}").to_lowercase();
    if let Some(phrase) = rules.blocked_phrase(&haystack) {
        return Err(ScrapeRejection::Blocked(phrase.to_string()));
    }

    Ok(ScrapedArticle {
        title,
        url: article_url.to_string(),
        content_html,
        image_url,
        fetched_at: Utc::now(),
    })
}

/// Detach every element matched by any of `matchers`, subtree included.
fn detach_matching(document: &mut Html, matchers: &[Matcher]) {
    if matchers.is_empty() {
        return;
    }
    let ids: Vec<_> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| matchers.iter().any(|m| m.matches(el)))
        .map(|el| el.id())
        .collect();
    debug!(count = ids.len(), "Detaching boilerplate elements");
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn og_image(document: &Html) -> Option<String> {
    document
        .select(&OG_IMAGE)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// First `<img>` in document order that sits inside one of the containers.
fn container_image(document: &Html, containers: &[Matcher]) -> Option<String> {
    document
        .select(&IMG)
        .filter(|img| {
            img.ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| containers.iter().any(|m| m.matches(&a)))
        })
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

/// Inner HTML of the first content container with enough text, else every
/// `<p>` of the page.
fn main_content(document: &Html, rules: &ScraperRules) -> String {
    let found = rules.content_matchers().iter().find_map(|m| {
        let el = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| m.matches(el))?;
        let len = el.text().collect::<String>().trim().chars().count();
        (len > rules.min_container_chars).then(|| el.inner_html())
    });
    match found {
        Some(html) => html,
        None => document.select(&PARAGRAPH).map(|p| p.html()).collect(),
    }
}

/// Resolve a possibly relative link against a base URL.
///
/// Handles absolute, protocol-relative (`//cdn/x.jpg`), root-relative
/// (`/x.jpg`) and relative (`x.jpg`) forms.
pub fn absolutize_url(base_url: &str, link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    if Url::parse(link).is_ok() {
        return Some(link.to_string());
    }
    Url::parse(base_url)
        .ok()?
        .join(link)
        .ok()
        .map(|u| u.to_string())
}
