//! Article page scraping.
//!
//! Scraping is data-driven rather than per-site:
//!
//! 1. **Cleaning**: scripts, embeds and boilerplate blocks are detached from the DOM
//! 2. **Extraction**: title, lead image and main content are picked by rule tables
//! 3. **Validation**: short, untitled and block/challenge pages are rejected
//!
//! | Module | Role |
//! |--------|------|
//! | [`article`] | fetch + extract ([`ArticleScraper`], [`extract_article`]) |
//! | [`rules`] | selector abstraction ([`rules::Matcher`]) and default rule tables |

pub mod article;
pub mod rules;

pub use article::{ArticleScraper, absolutize_url, extract_article};
pub use rules::{Matcher, ScraperRules};
