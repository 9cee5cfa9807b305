//! Utility functions for text handling, timestamps and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - HTML stripping and word counting for scraped content
//! - Lenient timestamp parsing for feed and sitemap dates
//! - String truncation and slugification for logging and file names
//! - JSON error detection for truncated provider responses
//! - File system validation for output directories

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::Html;
use std::fs as stdfs;
use std::io;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the
/// number of dropped bytes appended. Cuts always land on a char boundary.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of characters to keep
///
/// # Returns
///
/// The original string if it has at most `max` characters, otherwise a
/// truncated version with `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// First `max` characters of `s`, without any marker.
pub fn take_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the provider response is cut off by its token limit the JSON
/// fails with an EOF error; callers mention that in their error message.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Convert a title to a URL-friendly slug.
///
/// Lowercases the text, drops punctuation and joins words with single
/// hyphens.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("Test-Article!"), "test-article");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .split(|c: char| c == ' ' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Text content of an HTML fragment, entities decoded, trimmed.
pub fn strip_tags(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of whitespace separated words in the visible text of `html`.
pub fn word_count(html: &str) -> usize {
    strip_tags(html).split_whitespace().count()
}

/// Drop everything from the first `?` on.
pub fn strip_query(link: &str) -> &str {
    match link.find('?') {
        Some(i) => &link[..i],
        None => link,
    }
}

/// Parse the date formats seen in feeds and sitemaps.
///
/// Accepts RFC 3339 (`2024-01-02T10:00:00+00:00`), RFC 2822
/// (`Tue, 02 Jan 2024 10:00:00 GMT`), naive `YYYY-MM-DD HH:MM:SS` (taken as
/// UTC) and plain `YYYY-MM-DD`.
///
/// # Returns
///
/// `None` when the string is empty or matches none of the formats.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a scratch file.
///
/// # Errors
///
/// Returns the I/O error if the directory cannot be created or written.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let scratch_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    stdfs::File::create(&scratch_path)?;
    let _ = stdfs::remove_file(&scratch_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("ééé", 2);
        assert!(result.starts_with("éé…"));
        assert_eq!(take_chars("ééé", 2), "éé");
    }

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify_title("Hello World"), "hello-world");
        assert_eq!(slugify_title("Test-Article!"), "test-article");
        assert_eq!(slugify_title("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify_title("Special@#$Characters"), "specialcharacters");
        assert_eq!(
            slugify_title("Rust 2024 -- what's new?"),
            "rust-2024-whats-new"
        );
    }

    #[test]
    fn test_strip_tags_and_word_count() {
        let html = "<p>Hello <b>big</b> world &amp; friends</p>\n<p> again </p>";
        assert_eq!(word_count(html), 6);
        assert!(strip_tags(html).starts_with("Hello big world & friends"));
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("https://x.com/a?utm=1"), "https://x.com/a");
        assert_eq!(strip_query("https://x.com/a"), "https://x.com/a");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-02T10:00:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("Tue, 02 Jan 2024 10:00:00 +0000"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 10:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-02"),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday-ish"), None);
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let result: Result<serde_json::Value, _> = serde_json::from_str(json_eof);
        if let Err(e) = result {
            assert!(looks_truncated(&e));
        }
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        ensure_writable_dir(nested.to_str().unwrap()).await.unwrap();
        assert!(nested.is_dir());
    }
}
