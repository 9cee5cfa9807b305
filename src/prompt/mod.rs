//! Prompt construction.
//!
//! [`build`] turns a scraped article and its campaign into a
//! [`PromptRequest`]. The rewrite mode picks the template and the
//! temperature:
//!
//! | mode | temperature | template |
//! |------|-------------|----------|
//! | strict | 0.1 | [`templates::strict`] (normal when the source has no paragraphs) |
//! | normal | 0.5 | [`templates::normal`] |
//! | loose | max(0.7, configured) | [`templates::loose`] |
//!
//! `AI_URL_DIRECT` campaigns get [`templates::direct_url`] with web retrieval
//! enabled and the configured temperature.

pub mod templates;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::config::{CampaignConfig, ProcessingMode, RewriteMode, StyleConfig};
use crate::models::{PromptRequest, ScrapedArticle};
use crate::utils::{strip_tags, word_count};
use templates::{DirectParams, JSON_SCHEMA, NEGATIVE_CONSTRAINTS, RewriteParams, StyleFragments};

static PARAGRAPH_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*</p>\s*").unwrap());
static SUBHEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h[23][^>]*>").unwrap());

/// Custom prompts at or below this many characters are ignored.
const CUSTOM_PROMPT_MIN_CHARS: usize = 10;
/// Matched length window around the source word count.
const LENGTH_SLACK: usize = 30;
/// Smallest lower bound of a matched length window.
const LENGTH_FLOOR: usize = 50;
/// Targets reaching this many words get a Quick Summary block.
const SUMMARY_MIN_WORDS: usize = 600;

/// Measurements of the source article used by the style fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceAnalysis {
    pub word_count: usize,
    /// `<h2>`/`<h3>` opening tags.
    pub heading_count: usize,
    /// Plain-text paragraphs, empties dropped.
    pub paragraphs: Vec<String>,
}

impl SourceAnalysis {
    pub fn of(content_html: &str) -> Self {
        let paragraphs = PARAGRAPH_END
            .split(content_html)
            .map(strip_tags)
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            word_count: word_count(content_html),
            heading_count: SUBHEADING.find_iter(content_html).count(),
            paragraphs,
        }
    }

    /// `PARAGRAPH k:` numbered block for the strict template.
    pub fn paragraphs_block(&self) -> String {
        self.paragraphs
            .iter()
            .enumerate()
            .map(|(i, p)| format!("PARAGRAPH {}:\n{}\n\n", i + 1, p))
            .collect()
    }
}

/// Temperature sent for a rewrite mode.
pub fn rewrite_temperature(mode: RewriteMode, configured: f64) -> f64 {
    match mode {
        RewriteMode::Strict => 0.1,
        RewriteMode::Normal => 0.5,
        RewriteMode::Loose => configured.max(0.7),
    }
}

/// Target word range: the source length ± 30 when matching length, else the
/// configured range.
pub fn target_range(style: &StyleConfig, analysis: &SourceAnalysis) -> (usize, usize) {
    if style.match_length && analysis.word_count > 0 {
        let s = analysis.word_count;
        (s.saturating_sub(LENGTH_SLACK).max(LENGTH_FLOOR), s + LENGTH_SLACK)
    } else {
        (style.min_words, style.max_words)
    }
}

pub fn style_fragments(style: &StyleConfig, analysis: &SourceAnalysis) -> StyleFragments {
    let tone = if style.match_tone {
        "Analyze the source tone and replicate it exactly.".to_string()
    } else {
        format!("Tone: {}.", style.tone)
    };

    let voice = if !style.brand_voice.trim().is_empty() {
        format!("Adopt this Brand Voice: {}", style.brand_voice.trim())
    } else if style.match_brand_voice {
        "Keep the voice of the source publication.".to_string()
    } else {
        String::new()
    };

    let (min_words, max_words) = target_range(style, analysis);
    let length = if style.match_length && analysis.word_count > 0 {
        format!(
            "Keep the length similar to the source (approx {} words).",
            analysis.word_count
        )
    } else {
        format!("Target word count: Between {min_words} and {max_words} words.")
    };

    let headings = if style.match_headings {
        format!(
            "Maintain the same heading structure as the source ({} subheadings).",
            analysis.heading_count
        )
    } else {
        format!(
            "Use approximately {} subheadings (<h2> or <h3>).",
            style.max_headings
        )
    };

    let summary = if max_words >= SUMMARY_MIN_WORDS {
        "Include a <h3>Quick Summary</h3> at the very top with 3 bullet points."
    } else {
        "Do NOT include a summary section."
    };

    StyleFragments {
        tone,
        voice,
        audience: format!("Target audience: {}.", style.audience),
        length,
        headings,
        summary: summary.to_string(),
    }
}

/// Append the shared negative constraints and the JSON schema to a body.
fn finish(body: &str) -> String {
    format!("{body}\n\n{NEGATIVE_CONSTRAINTS}\n\nREQUIRED JSON STRUCTURE:\n{JSON_SCHEMA}")
}

/// Build the provider request for one article.
///
/// # Arguments
///
/// * `scraped` - The article being rewritten
/// * `campaign` - Style, mode and model settings
/// * `linking_context` - Rendered list of existing posts for internal links
#[instrument(level = "info", skip_all, fields(campaign = %campaign.id, mode = ?campaign.rewrite_mode))]
pub fn build(
    scraped: &ScrapedArticle,
    campaign: &CampaignConfig,
    linking_context: &str,
) -> PromptRequest {
    if campaign.processing_mode == ProcessingMode::AiUrlDirect {
        return build_direct(scraped, campaign);
    }

    let analysis = SourceAnalysis::of(&scraped.content_html);
    let style = style_fragments(&campaign.style, &analysis);
    let paragraphs = analysis.paragraphs_block();
    let params = RewriteParams {
        category: &campaign.category,
        language: &campaign.style.language,
        source_title: &scraped.title,
        source_content: &scraped.content_html,
        paragraphs: &paragraphs,
        paragraph_count: analysis.paragraphs.len(),
        style: &style,
        existing_context: linking_context,
    };

    let body = match campaign.custom_prompt.as_deref().map(str::trim) {
        Some(custom) if custom.chars().count() > CUSTOM_PROMPT_MIN_CHARS => custom.to_string(),
        _ => match campaign.rewrite_mode {
            RewriteMode::Strict if params.paragraph_count > 0 => templates::strict(&params),
            RewriteMode::Strict | RewriteMode::Normal => templates::normal(&params),
            RewriteMode::Loose => templates::loose(&params),
        },
    };
    debug!(
        words = analysis.word_count,
        headings = analysis.heading_count,
        paragraphs = analysis.paragraphs.len(),
        "Analyzed source"
    );

    PromptRequest {
        system_text: finish(&body),
        temperature: rewrite_temperature(campaign.rewrite_mode, campaign.temperature),
        model: campaign.model.clone(),
        web_retrieval: false,
        json_output: true,
    }
}

fn build_direct(scraped: &ScrapedArticle, campaign: &CampaignConfig) -> PromptRequest {
    let style = &campaign.style;
    let body = templates::direct_url(&DirectParams {
        category: &campaign.category,
        language: &style.language,
        source_url: &scraped.url,
        tone: &style.tone,
        audience: &style.audience,
        brand_voice: style.brand_voice.trim(),
        min_words: style.min_words,
        max_words: style.max_words,
    });
    PromptRequest {
        system_text: finish(&body),
        temperature: campaign.temperature,
        model: campaign.model.clone(),
        web_retrieval: true,
        json_output: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceType;
    use chrono::Utc;

    fn article(content_html: &str) -> ScrapedArticle {
        ScrapedArticle {
            title: "Source Title".to_string(),
            url: "https://site.test/story".to_string(),
            content_html: content_html.to_string(),
            image_url: None,
            fetched_at: Utc::now(),
        }
    }

    fn campaign(mode: RewriteMode) -> CampaignConfig {
        let mut c = CampaignConfig::new("c1", "https://site.test/feed", SourceType::Rss);
        c.processing_mode = ProcessingMode::AiRewrite;
        c.rewrite_mode = mode;
        c
    }

    const THREE_PARAS: &str = "<p>First one.</p>\n<p>Second <b>two</b>.</p>\n<p>  </p><h2>Mid</h2><p>Third three.</p>";

    #[test]
    fn test_source_analysis() {
        let a = SourceAnalysis::of(THREE_PARAS);
        assert_eq!(a.paragraphs.len(), 3);
        assert_eq!(a.paragraphs[1], "Second two.");
        assert_eq!(a.heading_count, 1);
        assert_eq!(a.word_count, 6);
    }

    #[test]
    fn test_strict_prompt_has_one_marker_per_paragraph() {
        let req = build(&article(THREE_PARAS), &campaign(RewriteMode::Strict), "ctx");
        let marker = Regex::new(r"PARAGRAPH (\d+):").unwrap();
        let numbers: Vec<usize> = marker
            .captures_iter(&req.system_text)
            .map(|c| c[1].parse().unwrap())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(req.temperature, 0.1);
        assert!(req.json_output);
        assert!(!req.web_retrieval);
    }

    #[test]
    fn test_strict_without_paragraphs_uses_normal_template() {
        let req = build(&article("plain text without paragraph tags"), &campaign(RewriteMode::Strict), "ctx");
        assert!(req.system_text.contains("PARAGRAPH 1:"));
        let req = build(&article(""), &campaign(RewriteMode::Strict), "ctx");
        assert!(!req.system_text.contains("PARAGRAPH BY PARAGRAPH"));
        assert!(req.system_text.contains("REWRITE GUIDELINES"));
        assert_eq!(req.temperature, 0.1);
    }

    #[test]
    fn test_temperature_policy() {
        assert_eq!(rewrite_temperature(RewriteMode::Strict, 1.5), 0.1);
        assert_eq!(rewrite_temperature(RewriteMode::Normal, 1.5), 0.5);
        assert_eq!(rewrite_temperature(RewriteMode::Loose, 0.3), 0.7);
        assert_eq!(rewrite_temperature(RewriteMode::Loose, 1.2), 1.2);
    }

    #[test]
    fn test_every_prompt_carries_constraints_and_schema() {
        for mode in [RewriteMode::Strict, RewriteMode::Normal, RewriteMode::Loose] {
            let req = build(&article(THREE_PARAS), &campaign(mode), "ctx");
            assert!(req.system_text.contains(NEGATIVE_CONSTRAINTS));
            assert!(req.system_text.contains("REQUIRED JSON STRUCTURE:"));
            assert!(req.system_text.ends_with(JSON_SCHEMA));
        }
    }

    #[test]
    fn test_custom_prompt_replaces_body() {
        let mut c = campaign(RewriteMode::Loose);
        c.custom_prompt = Some("  Write a limerick about this story.  ".to_string());
        let req = build(&article(THREE_PARAS), &c, "ctx");
        assert!(req.system_text.starts_with("Write a limerick about this story."));
        assert!(req.system_text.contains(NEGATIVE_CONSTRAINTS));
        assert!(req.system_text.ends_with(JSON_SCHEMA));
        assert!(!req.system_text.contains("CREATIVE RULES"));

        c.custom_prompt = Some("too short".to_string());
        let req = build(&article(THREE_PARAS), &c, "ctx");
        assert!(req.system_text.contains("CREATIVE RULES"));
    }

    #[test]
    fn test_style_fragments() {
        let mut style = StyleConfig::default();
        let analysis = SourceAnalysis {
            word_count: 200,
            heading_count: 2,
            paragraphs: vec![],
        };

        let f = style_fragments(&style, &analysis);
        assert_eq!(f.tone, "Tone: enthusiastic and conversational.");
        assert_eq!(f.voice, "");
        assert_eq!(f.length, "Target word count: Between 600 and 1000 words.");
        assert_eq!(f.headings, "Use approximately 1 subheadings (<h2> or <h3>).");
        assert!(f.summary.contains("Quick Summary"));

        style.match_tone = true;
        style.match_length = true;
        style.match_headings = true;
        style.brand_voice = "dry wit".to_string();
        let f = style_fragments(&style, &analysis);
        assert_eq!(f.tone, "Analyze the source tone and replicate it exactly.");
        assert_eq!(f.voice, "Adopt this Brand Voice: dry wit");
        assert!(f.length.contains("approx 200 words"));
        assert!(f.headings.contains("(2 subheadings)"));
        assert_eq!(f.summary, "Do NOT include a summary section.");
        assert_eq!(target_range(&style, &analysis), (170, 230));

        style.brand_voice.clear();
        style.match_brand_voice = true;
        assert_eq!(style_fragments(&style, &analysis).voice, "Keep the voice of the source publication.");
    }

    #[test]
    fn test_matched_length_floor() {
        let style = StyleConfig {
            match_length: true,
            ..StyleConfig::default()
        };
        let analysis = SourceAnalysis {
            word_count: 40,
            ..SourceAnalysis::default()
        };
        assert_eq!(target_range(&style, &analysis), (50, 70));
    }

    #[test]
    fn test_direct_url_prompt() {
        let mut c = campaign(RewriteMode::Strict);
        c.processing_mode = ProcessingMode::AiUrlDirect;
        c.temperature = 0.9;
        let req = build(&article(THREE_PARAS), &c, "ctx");
        assert!(req.web_retrieval);
        assert!(!req.json_output);
        assert_eq!(req.temperature, 0.9);
        assert!(req.system_text.contains("INPUT URL: https://site.test/story"));
        assert!(req.system_text.contains(NEGATIVE_CONSTRAINTS));
        assert_eq!(req.model, "gemini-2.5-flash");
    }
}
