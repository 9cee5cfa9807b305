//! Rule tables driving the article scraper.
//!
//! All lists are plain data with defaults tuned for WordPress-style news
//! sites and can be overridden from the `scraper:` section of the config.

use scraper::ElementRef;
use serde::Deserialize;

/// A single element test: `tag`, `.class` (whole class token) or `#id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Tag(String),
    Class(String),
    Id(String),
}

impl Matcher {
    /// Parse `article`, `.entry-content` or `#content`. Empty input gives `None`.
    pub fn parse(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim();
        if let Some(class) = pattern.strip_prefix('.') {
            (!class.is_empty()).then(|| Matcher::Class(class.to_string()))
        } else if let Some(id) = pattern.strip_prefix('#') {
            (!id.is_empty()).then(|| Matcher::Id(id.to_string()))
        } else {
            (!pattern.is_empty()).then(|| Matcher::Tag(pattern.to_ascii_lowercase()))
        }
    }

    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        let el = element.value();
        match self {
            Matcher::Tag(tag) => el.name().eq_ignore_ascii_case(tag),
            Matcher::Class(class) => el.classes().any(|c| c == class),
            Matcher::Id(id) => el.id() == Some(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperRules {
    /// Elements dropped wholesale before extraction.
    pub strip_tags: Vec<String>,
    /// Class tokens marking players, bylines, share widgets, ads and sidebars.
    pub boilerplate_classes: Vec<String>,
    /// Main content containers, tried in order.
    pub content_selectors: Vec<String>,
    /// Containers searched for a fallback image.
    pub image_containers: Vec<String>,
    /// Lower-case phrases that mark a block or challenge page.
    pub blocked_phrases: Vec<String>,
    /// A container is accepted when its text is longer than this.
    pub min_container_chars: usize,
    /// Scrapes with less stripped content than this are rejected.
    pub min_content_chars: usize,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ScraperRules {
    fn default() -> Self {
        Self {
            strip_tags: strings(&["script", "style", "noscript", "iframe", "svg"]),
            boilerplate_classes: strings(&[
                "jwplayer",
                "jw-player",
                "video-container",
                "sticky-video",
                "video-wrapper",
                "post-meta",
                "entry-meta",
                "article-meta",
                "author",
                "byline",
                "post-info",
                "date",
                "published",
                "updated",
                "time",
                "entry-date",
                "share-buttons",
                "social-icons",
                "related-posts",
                "social-share",
                "ads",
                "advertisement",
                "ad-container",
                "sidebar",
                "widget-area",
            ]),
            content_selectors: strings(&[
                ".entry-content",
                ".post-content",
                "article",
                "main",
                "#content",
                ".story-content",
                ".post_details",
                ".content-body",
            ]),
            image_containers: strings(&["article", ".entry-content", ".post-content"]),
            blocked_phrases: strings(&[
                "sorry, you have been blocked",
                "attention required! | cloudflare",
                "access denied",
                "403 forbidden",
                "please enable cookies",
                "security check to access",
                "challenge validation",
            ]),
            min_container_chars: 100,
            min_content_chars: 50,
        }
    }
}

impl ScraperRules {
    pub fn strip_matchers(&self) -> Vec<Matcher> {
        self.strip_tags.iter().filter_map(|t| Matcher::parse(t)).collect()
    }

    pub fn boilerplate_matchers(&self) -> Vec<Matcher> {
        self.boilerplate_classes
            .iter()
            .map(|c| c.trim().trim_start_matches('.'))
            .filter(|c| !c.is_empty())
            .map(|c| Matcher::Class(c.to_string()))
            .collect()
    }

    pub fn content_matchers(&self) -> Vec<Matcher> {
        self.content_selectors.iter().filter_map(|s| Matcher::parse(s)).collect()
    }

    pub fn image_matchers(&self) -> Vec<Matcher> {
        self.image_containers.iter().filter_map(|s| Matcher::parse(s)).collect()
    }

    /// First blocked phrase found in the lower-cased text.
    pub fn blocked_phrase(&self, lower_text: &str) -> Option<&str> {
        self.blocked_phrases
            .iter()
            .map(String::as_str)
            .find(|p| !p.is_empty() && lower_text.contains(&p.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_matcher_parse() {
        assert_eq!(Matcher::parse(".entry-content"), Some(Matcher::Class("entry-content".into())));
        assert_eq!(Matcher::parse("#content"), Some(Matcher::Id("content".into())));
        assert_eq!(Matcher::parse("ARTICLE"), Some(Matcher::Tag("article".into())));
        assert_eq!(Matcher::parse(" "), None);
        assert_eq!(Matcher::parse("."), None);
    }

    #[test]
    fn test_class_matcher_uses_whole_tokens() {
        let html = Html::parse_fragment(r#"<div class="post-meta big"></div><div class="update-date"></div>"#);
        let divs: Vec<_> = html.select(&Selector::parse("div").unwrap()).collect();
        let date = Matcher::Class("date".into());
        let meta = Matcher::Class("post-meta".into());
        assert!(meta.matches(&divs[0]));
        assert!(!date.matches(&divs[1]));
    }

    #[test]
    fn test_blocked_phrase() {
        let rules = ScraperRules::default();
        assert_eq!(
            rules.blocked_phrase("attention required! | cloudflare"),
            Some("attention required! | cloudflare")
        );
        assert_eq!(rules.blocked_phrase("a perfectly normal article"), None);
    }

    #[test]
    fn test_rules_from_yaml_override() {
        let rules: ScraperRules = serde_yaml::from_str("content_selectors: ['.body']\n").unwrap();
        assert_eq!(rules.content_matchers(), vec![Matcher::Class("body".into())]);
        assert_eq!(rules.strip_tags.len(), 5);
    }
}
