//! Typed YAML configuration: provider, fetcher, scraper rules, pipeline
//! limits and the campaign list.
//!
//! Everything has a default so a config file only needs its campaigns.
//! [`load_config`] reads, parses and validates in one step.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::scrapers::rules::ScraperRules;
use crate::utils::parse_timestamp;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub scraper: ScraperRules,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub campaigns: Vec<CampaignConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: usize,
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            timeout_secs: default_provider_timeout(),
            max_retries: 0,
            retry_base_delay_ms: default_retry_base_delay(),
        }
    }
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}
fn default_provider_timeout() -> u64 {
    60
}
fn default_retry_base_delay() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    15
}
pub(crate) fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0 Safari/537.36 DiyaraBot"
        .to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_campaigns_per_tick")]
    pub max_campaigns_per_tick: usize,
    #[serde(default = "default_linking_context_posts")]
    pub linking_context_posts: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_campaigns_per_tick: default_max_campaigns_per_tick(),
            linking_context_posts: default_linking_context_posts(),
        }
    }
}

fn default_max_campaigns_per_tick() -> usize {
    3
}
fn default_linking_context_posts() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            log_path: default_log_path(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}
fn default_log_path() -> PathBuf {
    PathBuf::from("./output/processed.jsonl")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceType {
    #[default]
    #[serde(rename = "RSS", alias = "rss")]
    Rss,
    #[serde(rename = "DIRECT", alias = "direct")]
    Direct,
}

/// How a scraped article becomes the published one.
///
/// Unrecognised values fall back to `AS_IS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum ProcessingMode {
    #[default]
    #[serde(rename = "AS_IS")]
    AsIs,
    #[serde(rename = "AI_REWRITE")]
    AiRewrite,
    #[serde(rename = "AI_URL_DIRECT")]
    AiUrlDirect,
    #[serde(rename = "TRANSLATOR_SPIN")]
    TranslatorSpin,
}

impl From<String> for ProcessingMode {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "AI_REWRITE" => ProcessingMode::AiRewrite,
            "AI_URL_DIRECT" => ProcessingMode::AiUrlDirect,
            "TRANSLATOR_SPIN" => ProcessingMode::TranslatorSpin,
            _ => ProcessingMode::AsIs,
        }
    }
}

impl ProcessingMode {
    /// Modes that call the provider.
    pub fn uses_ai(self) -> bool {
        matches!(self, ProcessingMode::AiRewrite | ProcessingMode::AiUrlDirect)
    }
}

/// Rewrite strategy. Unrecognised values fall back to `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum RewriteMode {
    Loose,
    #[default]
    Normal,
    Strict,
}

impl From<String> for RewriteMode {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "loose" => RewriteMode::Loose,
            "strict" => RewriteMode::Strict,
            _ => RewriteMode::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Publish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Active,
    Paused,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type", default)]
    pub source_type: SourceType,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default, deserialize_with = "deserialize_start_date")]
    pub start_date: Option<DateTime<Utc>>,
    /// Lower-cased, trimmed, never empty strings.
    #[serde(default, deserialize_with = "deserialize_keywords")]
    pub url_keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub tone: String,
    pub audience: String,
    pub brand_voice: String,
    pub language: String,
    pub min_words: usize,
    pub max_words: usize,
    pub max_headings: usize,
    pub match_length: bool,
    pub match_headings: bool,
    pub match_tone: bool,
    pub match_brand_voice: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            tone: "enthusiastic and conversational".to_string(),
            audience: "general online readers".to_string(),
            brand_voice: String::new(),
            language: "English".to_string(),
            min_words: 600,
            max_words: 1000,
            max_headings: 1,
            match_length: false,
            match_headings: false,
            match_tone: false,
            match_brand_voice: false,
        }
    }
}

/// One content campaign: where to read, how to rewrite, where it goes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    pub id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub source: SourceConfig,
    pub filters: FilterConfig,
    pub processing_mode: ProcessingMode,
    pub rewrite_mode: RewriteMode,
    pub style: StyleConfig,
    pub model: String,
    pub temperature: f64,
    pub custom_prompt: Option<String>,
    pub category: String,
    pub post_status: PostStatus,
    pub max_items: usize,
    pub max_posts_limit: usize,
    pub batch_size: usize,
    pub skip_failed_candidates: bool,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            status: CampaignStatus::Active,
            source: SourceConfig::default(),
            filters: FilterConfig::default(),
            processing_mode: ProcessingMode::AsIs,
            rewrite_mode: RewriteMode::Normal,
            style: StyleConfig::default(),
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            custom_prompt: None,
            category: "general".to_string(),
            post_status: PostStatus::Draft,
            max_items: 50,
            max_posts_limit: 0,
            batch_size: 1,
            skip_failed_candidates: false,
        }
    }
}

impl CampaignConfig {
    pub fn new(id: impl Into<String>, url: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            id: id.into(),
            source: SourceConfig {
                url: url.into(),
                source_type,
            },
            ..Self::default()
        }
    }

    /// Display name, falling back to the id.
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

impl Config {
    /// Look up a campaign by id.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownCampaign`] when no campaign has that id.
    pub fn campaign(&self, id: &str) -> Result<&CampaignConfig, ConfigError> {
        self.campaigns
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ConfigError::UnknownCampaign(id.to_string()))
    }
}

fn deserialize_start_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid start_date '{s}'"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordList {
    Csv(String),
    List(Vec<String>),
}

/// Accept either a YAML list or a comma separated string.
fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<KeywordList> = Option::deserialize(deserializer)?;
    let items: Vec<String> = match raw {
        None => Vec::new(),
        Some(KeywordList::Csv(s)) => s.split(',').map(str::to_string).collect(),
        Some(KeywordList::List(v)) => v,
    };
    Ok(normalize_keywords(items))
}

pub fn normalize_keywords<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.pipeline.max_campaigns_per_tick == 0 {
        return Err(ConfigError::Validation(
            "pipeline.max_campaigns_per_tick must be at least 1".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for campaign in &config.campaigns {
        if campaign.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "campaign with empty 'id'".to_string(),
            ));
        }
        if !seen.insert(campaign.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate campaign id '{}'",
                campaign.id
            )));
        }
        validate_campaign(campaign)?;
    }
    Ok(())
}

pub fn validate_campaign(campaign: &CampaignConfig) -> Result<(), ConfigError> {
    let id = &campaign.id;
    if campaign.source.url.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "campaign '{id}': source.url must not be empty"
        )));
    }
    if campaign.style.min_words > campaign.style.max_words {
        return Err(ConfigError::Validation(format!(
            "campaign '{id}': min_words ({}) is greater than max_words ({})",
            campaign.style.min_words, campaign.style.max_words
        )));
    }
    if !(0.0..=2.0).contains(&campaign.temperature) {
        return Err(ConfigError::Validation(format!(
            "campaign '{id}': temperature {} is outside 0..=2",
            campaign.temperature
        )));
    }
    if campaign.processing_mode.uses_ai() && campaign.model.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "campaign '{id}': an AI processing mode needs a 'model'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"
provider:
  api_key: "abc"
campaigns:
  - id: tech
    name: Tech news
    source:
      url: https://example.com/feed
      type: RSS
    filters:
      start_date: "2024-01-01"
      url_keywords: " AI, , Chips "
    processing_mode: AI_REWRITE
    rewrite_mode: strict
    style:
      tone: calm
      match_length: true
  - id: blog
    source:
      url: https://blog.example.com
      type: DIRECT
    rewrite_mode: sideways
    processing_mode: something_else
"#;

    #[test]
    fn test_parse_sample_config() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        validate_config(&config).unwrap();

        assert_eq!(config.provider.api_key.as_deref(), Some("abc"));
        assert_eq!(config.provider.timeout_secs, 60);
        assert_eq!(config.fetch.timeout_secs, 15);
        assert_eq!(config.pipeline.max_campaigns_per_tick, 3);

        let tech = config.campaign("tech").unwrap();
        assert_eq!(tech.processing_mode, ProcessingMode::AiRewrite);
        assert_eq!(tech.rewrite_mode, RewriteMode::Strict);
        assert_eq!(tech.filters.url_keywords, vec!["ai", "chips"]);
        assert_eq!(
            tech.filters.start_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(tech.style.tone, "calm");
        assert!(tech.style.match_length);
        assert_eq!(tech.style.max_words, 1000);
        assert_eq!(tech.model, "gemini-2.5-flash");
        assert_eq!(tech.max_items, 50);

        let blog = config.campaign("blog").unwrap();
        assert_eq!(blog.source.source_type, SourceType::Direct);
        assert_eq!(blog.rewrite_mode, RewriteMode::Normal);
        assert_eq!(blog.processing_mode, ProcessingMode::AsIs);
        assert_eq!(blog.label(), "blog");
    }

    #[test]
    fn test_keywords_as_list() {
        let yaml = "url_keywords: [\" Rust \", \"\", \"TOKIO\"]\n";
        let filters: FilterConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(filters.url_keywords, vec!["rust", "tokio"]);
    }

    #[test]
    fn test_invalid_start_date_is_rejected() {
        let yaml = "start_date: \"not a date\"\n";
        assert!(serde_yaml::from_str::<FilterConfig>(yaml).is_err());
    }

    #[test]
    fn test_unknown_campaign() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let err = config.campaign("missing").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCampaign(id) if id == "missing"));
    }

    #[test]
    fn test_validation_rejects_bad_campaigns() {
        let mut config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        config.campaigns[0].style.min_words = 2000;
        assert!(matches!(validate_config(&config), Err(ConfigError::Validation(_))));

        let mut config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        config.campaigns[1].id = "tech".to_string();
        assert!(matches!(validate_config(&config), Err(ConfigError::Validation(_))));

        let mut config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        config.campaigns[0].temperature = 3.5;
        assert!(validate_config(&config).is_err());

        let mut config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        config.campaigns[0].model = " ".to_string();
        assert!(validate_config(&config).is_err());

        let mut config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        config.campaigns[1].source.url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoblog.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.campaigns.len(), 2);

        let missing = load_config(&dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(ConfigError::ReadFile(_))));
    }
}
