//! Error types for every stage of the content pipeline.
//!
//! Each concern gets its own `thiserror` enum. [`PipelineError`] is the one
//! callers see from a run; it folds the others in and knows which stage
//! failed and whether the failure is a benign "nothing to do" signal.

use thiserror::Error;

/// Configuration problems: unreadable files, invalid campaigns, missing
/// provider credentials.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("provider API key is missing")]
    MissingApiKey,
    #[error("AI model is not set for this campaign")]
    MissingModel,
    #[error("campaign source URL is empty")]
    EmptySourceUrl,
    #[error("invalid campaign: {0}")]
    UnknownCampaign(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("HTTP request failed for {url}: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("non-OK response ({status}) from {url}")]
    Status { url: String, status: u16 },
    #[error("response from {url} is too short ({len} bytes)")]
    TooShort { url: String, len: usize },
}

/// Why the article scraper refused a page.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScrapeRejection {
    #[error("page has no title")]
    MissingTitle,
    #[error("content too short ({0} chars)")]
    ContentTooShort(usize),
    #[error("content looks blocked (matched \"{0}\")")]
    Blocked(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider is not configured: {0}")]
    NotConfigured(#[from] ConfigError),
    #[error("transport error calling provider: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider HTTP error {status}: {snippet}")]
    HttpError { status: u16, snippet: String },
    #[error("unexpected response from provider: {0}")]
    BadResponse(String),
    #[error("provider returned empty text")]
    EmptyResponse,
    #[error("provider did not return a JSON object")]
    NoJsonObject,
    #[error("failed to parse JSON from provider text: {0}")]
    JsonParseError(String),
}

impl ProviderError {
    /// Transient failures worth another attempt by a retrying caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::EmptyResponse => true,
            ProviderError::HttpError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("log store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode log record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("corrupt log record on line {line}: {source}")]
    Corrupt { line: usize, source: serde_json::Error },
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publisher I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode article: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Pipeline state a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Discover,
    Filter,
    Scrape,
    CallProvider,
    Normalize,
    Publish,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Discover => "discover",
            Stage::Filter => "filter",
            Stage::Scrape => "scrape",
            Stage::CallProvider => "call_provider",
            Stage::Normalize => "normalize",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Terminal failure of one pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no candidates found in source {0}")]
    NoCandidates(String),
    #[error("no new candidates to process for campaign {0}")]
    NoNewCandidates(String),
    #[error("failed to scrape article content from {0}")]
    ScrapeFailed(String),
    #[error(transparent)]
    Provider(ProviderError),
    #[error("final content is empty after processing")]
    EmptyFinalContent,
    #[error("publisher failed: {0}")]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ProviderError> for PipelineError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotConfigured(c) => PipelineError::Config(c),
            other => PipelineError::Provider(other),
        }
    }
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Config(_) => Stage::Start,
            PipelineError::NoCandidates(_) => Stage::Discover,
            PipelineError::NoNewCandidates(_) => Stage::Filter,
            PipelineError::ScrapeFailed(_) => Stage::Scrape,
            PipelineError::Provider(_) => Stage::CallProvider,
            PipelineError::EmptyFinalContent => Stage::Normalize,
            PipelineError::Publish(_) | PipelineError::Store(_) => Stage::Publish,
        }
    }

    /// "The well has run dry": expected, logged quietly.
    pub fn is_benign(&self) -> bool {
        matches!(self, PipelineError::NoCandidates(_) | PipelineError::NoNewCandidates(_))
    }

    /// Failures that end a batch without being treated as faults.
    pub fn stops_batch_quietly(&self) -> bool {
        self.is_benign() || matches!(self, PipelineError::Config(ConfigError::UnknownCampaign(_)))
    }
}
