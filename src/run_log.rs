//! Per-run message log.
//!
//! Every campaign run keeps a human-readable timeline of what it did. Each
//! entry is emitted through `tracing` as it happens and also kept as a
//! `[LEVEL] message` line, which ends up in `ProcessedRecord::messages`.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "[INFO]",
            Level::Warn => "[WARN]",
            Level::Error => "[ERROR]",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunLog {
    pub campaign_id: String,
    pub started_at: DateTime<Utc>,
    lines: Vec<String>,
}

impl RunLog {
    pub fn new(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            started_at: Utc::now(),
            lines: Vec::new(),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Level::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message.into());
    }

    fn push(&mut self, level: Level, message: String) {
        let campaign = self.campaign_id.as_str();
        match level {
            Level::Info => info!(campaign, "{message}"),
            Level::Warn => warn!(campaign, "{message}"),
            Level::Error => error!(campaign, "{message}"),
        }
        self.lines.push(format!("{} {message}", level.tag()));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Milliseconds since the run started.
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}
