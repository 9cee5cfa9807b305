//! Command-line interface definitions for autoblog_engine.
//!
//! This module defines the CLI arguments and subcommands using the `clap` crate.
//! The API key can also be supplied through the environment.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use autoblog_engine::config::SourceType;

/// Command-line arguments for the autoblog_engine binary.
///
/// # Examples
///
/// ```sh
/// # One article for a campaign
/// autoblog_engine --config autoblog.yaml run tech-news
///
/// # Walk every campaign once (what cron calls)
/// GEMINI_API_KEY=... autoblog_engine tick
///
/// # Check what a feed yields
/// autoblog_engine test-source https://example.com/feed --type rss
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "autoblog.yaml")]
    pub config: PathBuf,

    /// Provider API key, overrides `provider.api_key` from the config file
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Override `output.dir` from the config file
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run one campaign up to `--limit` times
    Run {
        campaign: String,
        #[arg(short, long, default_value_t = 1)]
        limit: usize,
    },
    /// Run every active campaign once, honouring per-tick limits
    Tick,
    /// Discover a source and print the candidates it yields
    TestSource {
        url: String,
        #[arg(short = 't', long = "type", value_enum, default_value_t = SourceKind::Rss)]
        source_type: SourceKind,
    },
    /// Load and validate the configuration, then exit
    Validate,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Rss,
    Direct,
}

impl From<SourceKind> for SourceType {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Rss => SourceType::Rss,
            SourceKind::Direct => SourceType::Direct,
        }
    }
}
