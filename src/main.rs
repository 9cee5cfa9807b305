//! # autoblog_engine
//!
//! Command-line driver for the content pipeline: loads the YAML config,
//! wires the HTTP fetcher, the Gemini client, the JSON-lines log and the
//! JSON publisher together, then runs what was asked for.
//!
//! ## Usage
//!
//! ```sh
//! autoblog_engine --config autoblog.yaml run tech-news --limit 3
//! autoblog_engine tick
//! autoblog_engine test-source https://example.com/sitemap.xml --type direct
//! autoblog_engine validate
//! ```

use std::error::Error;
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::Parser;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use autoblog_engine::api::{GeminiClient, RetryGenerate};
use autoblog_engine::config::{Config, load_config};
use autoblog_engine::fetch::HttpFetcher;
use autoblog_engine::outputs::JsonPublisher;
use autoblog_engine::pipeline::Pipeline;
use autoblog_engine::store::JsonlLogStore;
use autoblog_engine::utils::{ensure_writable_dir, truncate_for_log};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    let args = Cli::parse();
    debug!(config = %args.config.display(), command = ?args.command, "Parsed CLI arguments");

    let mut config = match load_config(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!(path = %args.config.display(), error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    info!(path = %args.config.display(), campaigns = config.campaigns.len(), "Loaded configuration");

    if args.command == Command::Validate {
        info!("Configuration is valid");
        return Ok(());
    }

    if let Some(key) = args.api_key.filter(|k| !k.trim().is_empty()) {
        config.provider.api_key = Some(key);
    }
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }

    // Early check: ensure output dir is writable
    let output_dir = config.output.dir.to_string_lossy().to_string();
    if let Err(e) = ensure_writable_dir(&output_dir).await {
        error!(
            path = %output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let pipeline = build_pipeline(config).await?;

    match args.command {
        Command::Run { campaign, limit } => {
            let produced = pipeline.run_batch(&campaign, limit).await?;
            info!(%campaign, produced, "Run complete");
        }
        Command::Tick => {
            let summary = pipeline.run_tick(Utc::now()).await?;
            info!(
                campaigns = summary.campaigns_run,
                articles = summary.articles,
                paused = summary.skipped_paused,
                at_limit = summary.skipped_at_limit,
                "Tick complete"
            );
        }
        Command::TestSource { url, source_type } => {
            let candidates = pipeline.test_source(&url, source_type.into()).await?;
            for c in &candidates {
                let published = c
                    .published_at
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_else(|| "unknown date".to_string());
                println!("{published}  {}", truncate_for_log(&c.link, 200));
            }
            info!(count = candidates.len(), "Source test complete");
        }
        Command::Validate => {}
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

type CliPipeline = Pipeline<HttpFetcher, RetryGenerate<GeminiClient>, JsonlLogStore, JsonPublisher>;

async fn build_pipeline(config: Config) -> Result<CliPipeline, Box<dyn Error>> {
    let fetcher = HttpFetcher::new(&config.fetch)?;
    let generator = RetryGenerate::new(
        GeminiClient::new(&config.provider)?,
        config.provider.max_retries,
        Duration::from_millis(config.provider.retry_base_delay_ms),
    );
    let store = JsonlLogStore::open(&config.output.log_path).await?;
    let publisher = JsonPublisher::new(config.output.dir.clone());
    Ok(Pipeline::new(config, fetcher, generator, store, publisher))
}
