//! Data models flowing through the content pipeline.
//!
//! This module defines the value objects produced and consumed by each stage:
//! - [`SourceCandidate`]: A discovered article link with its publish date
//! - [`ScrapedArticle`]: Cleaned title, body and image extracted from a page
//! - [`PromptRequest`]: The instruction document sent to the provider
//! - [`AiResult`]: The normalized provider answer
//! - [`ArticleRecord`]: What is handed to the publisher
//! - [`ProcessedRecord`]: The append-only audit entry for one run
//!
//! Campaign settings live in [`crate::config`]; the models here are created
//! and discarded within a single run, except for the records which outlive it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{PostStatus, ProcessingMode};

/// A candidate article link found by the discoverer.
///
/// # Fields
///
/// * `link` - Absolute article URL (query string already removed for feeds)
/// * `published_at` - Publish time, `None` when the source gave an unparseable date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCandidate {
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl SourceCandidate {
    pub fn new(link: impl Into<String>, published_at: Option<DateTime<Utc>>) -> Self {
        Self {
            link: link.into(),
            published_at,
        }
    }

    /// Unix timestamp used for ordering; unknown dates sort as epoch 0.
    pub fn timestamp(&self) -> i64 {
        self.published_at.map(|d| d.timestamp()).unwrap_or(0)
    }
}

/// Article content extracted by the scraper.
///
/// Only produced when the title is non-empty and the stripped body holds at
/// least 50 characters of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedArticle {
    pub title: String,
    pub url: String,
    /// Inner HTML of the main content container (or concatenated `<p>` blocks).
    pub content_html: String,
    pub image_url: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// An instruction document ready to send to the generative-text provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub system_text: String,
    pub temperature: f64,
    pub model: String,
    /// Let the provider read the web itself (URL-direct mode).
    pub web_retrieval: bool,
    /// Ask for a JSON MIME type in the response.
    pub json_output: bool,
}

/// Canonical provider answer after normalization.
///
/// Every string field is empty when the provider omitted it or sent the
/// wrong type. `raw_json` keeps the parsed object untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiResult {
    pub title: String,
    pub content_html: String,
    pub meta_description: String,
    pub focus_keyphrase: String,
    pub long_tail_keyword: String,
    pub slug: String,
    pub image_alt: String,
    pub synonyms: String,
    pub raw_json: Value,
}

/// Outcome recorded for a processed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Published,
    Draft,
    Skipped,
}

impl From<PostStatus> for RecordStatus {
    fn from(status: PostStatus) -> Self {
        match status {
            PostStatus::Publish => RecordStatus::Published,
            PostStatus::Draft => RecordStatus::Draft,
        }
    }
}

/// The finished article handed to the publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub campaign_id: String,
    pub source_url: String,
    pub title: String,
    pub content_html: String,
    pub image_url: Option<String>,
    pub slug: String,
    pub status: PostStatus,
    /// SEO fields, present only for rewritten articles.
    pub seo: Option<AiResult>,
    pub processing_mode: ProcessingMode,
    pub created_at: DateTime<Utc>,
}

/// One line of the append-only processing log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub campaign_id: String,
    pub title: String,
    pub source_url: String,
    /// Publisher reference (a file path for the JSON publisher), empty when skipped.
    pub target_ref: String,
    pub status: RecordStatus,
    pub tokens_estimate: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_candidate_timestamp_unknown_is_zero() {
        let c = SourceCandidate::new("https://example.com/a", None);
        assert_eq!(c.timestamp(), 0);

        let when = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let c = SourceCandidate::new("https://example.com/b", Some(when));
        assert_eq!(c.timestamp(), when.timestamp());
    }

    #[test]
    fn test_record_status_from_post_status() {
        assert_eq!(RecordStatus::from(PostStatus::Publish), RecordStatus::Published);
        assert_eq!(RecordStatus::from(PostStatus::Draft), RecordStatus::Draft);
    }

    #[test]
    fn test_processed_record_serialization() {
        let record = ProcessedRecord {
            campaign_id: "tech".to_string(),
            title: "Hello".to_string(),
            source_url: "https://example.com/a".to_string(),
            target_ref: "out/tech/a.json".to_string(),
            status: RecordStatus::Skipped,
            tokens_estimate: 0,
            created_at: Utc::now(),
            messages: vec!["[INFO] done".to_string()],
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"status\":\"skipped\""));

        let back: ProcessedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.campaign_id, "tech");
        assert_eq!(back.messages.len(), 1);
    }
}
