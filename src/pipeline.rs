//! Campaign orchestration.
//!
//! One run takes a campaign through
//! `discover → filter → scrape → (rewrite) → publish → record`:
//!
//! ```text
//! START ─▶ DISCOVER ─▶ FILTER ─▶ SCRAPE ─┬─ AS_IS ───────────────────────────────┬─▶ PUBLISH
//!                                        └─ AI ─▶ BUILD_PROMPT ─▶ CALL ─▶ NORMALIZE ┘
//! ```
//!
//! Any failure ends the run with a [`PipelineError`] naming its stage and
//! nothing is published. [`Pipeline::run_batch`] repeats runs for one
//! campaign and [`Pipeline::run_tick`] walks every campaign once, which is
//! what an external scheduler calls.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

use crate::api::{GenerateText, generate};
use crate::config::{CampaignConfig, CampaignStatus, Config, ProcessingMode, SourceType};
use crate::discovery::{Discoverer, normalize_source_url, site_base};
use crate::error::{ConfigError, PipelineError};
use crate::fetch::FetchText;
use crate::filter;
use crate::models::{AiResult, ArticleRecord, ProcessedRecord, RecordStatus, SourceCandidate};
use crate::outputs::{Publisher, linking_context};
use crate::prompt;
use crate::run_log::RunLog;
use crate::scrapers::ArticleScraper;
use crate::store::LogStore;
use crate::utils::strip_tags;

/// Items read from a source when testing it from the CLI.
const TEST_SOURCE_ITEMS: usize = 10;

/// Rough prompt overhead added to every token estimate.
const TOKEN_OVERHEAD: u64 = 150;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub record_id: u64,
    pub title: String,
    pub source_url: String,
    pub target_ref: String,
}

/// Result of walking every campaign once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub ticked_at: Option<DateTime<Utc>>,
    /// Campaigns that produced at least one article.
    pub campaigns_run: usize,
    pub articles: usize,
    pub skipped_paused: usize,
    pub skipped_at_limit: usize,
}

/// The content pipeline with its collaborators.
///
/// Every collaborator is a trait so tests can swap the network, the model,
/// the log and the publisher for in-process doubles.
#[derive(Debug)]
pub struct Pipeline<F, G, L, P> {
    config: Config,
    fetcher: F,
    generator: G,
    store: L,
    publisher: P,
}

impl<F, G, L, P> Pipeline<F, G, L, P>
where
    F: FetchText,
    G: GenerateText,
    L: LogStore,
    P: Publisher,
{
    pub fn new(config: Config, fetcher: F, generator: G, store: L, publisher: P) -> Self {
        Self {
            config,
            fetcher,
            generator,
            store,
            publisher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &L {
        &self.store
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.config.fetch.timeout_secs)
    }

    /// Run one campaign by id.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownCampaign`] for an id not in the config, otherwise
    /// whatever [`Pipeline::run_campaign`] reports.
    pub async fn run_once(&self, campaign_id: &str) -> Result<RunOutcome, PipelineError> {
        let campaign = self.config.campaign(campaign_id)?;
        self.run_campaign(campaign).await
    }

    /// Take one candidate of a campaign through the whole pipeline.
    #[instrument(level = "info", skip_all, fields(campaign = %campaign.id))]
    pub async fn run_campaign(&self, campaign: &CampaignConfig) -> Result<RunOutcome, PipelineError> {
        let mut log = RunLog::new(&campaign.id);
        log.info(format!("Starting run for campaign '{}'", campaign.label()));

        let result = self.execute(campaign, &mut log).await;
        match &result {
            Ok(outcome) => info!(
                record_id = outcome.record_id,
                target = %outcome.target_ref,
                elapsed_ms = log.elapsed_ms(),
                "Run finished"
            ),
            Err(e) if e.is_benign() => info!(stage = %e.stage(), reason = %e, "Nothing to do"),
            Err(e) => error!(
                stage = %e.stage(),
                error = %e,
                elapsed_ms = log.elapsed_ms(),
                "Run failed"
            ),
        }
        result
    }

    async fn execute(
        &self,
        campaign: &CampaignConfig,
        log: &mut RunLog,
    ) -> Result<RunOutcome, PipelineError> {
        if campaign.source.url.trim().is_empty() {
            return Err(ConfigError::EmptySourceUrl.into());
        }
        let source_url = normalize_source_url(&campaign.source.url);
        let timeout = self.fetch_timeout();

        // discover
        let candidates = Discoverer::new(&self.fetcher, timeout)
            .discover(&source_url, campaign.source.source_type, campaign.max_items)
            .await;
        if candidates.is_empty() {
            return Err(PipelineError::NoCandidates(source_url));
        }
        log.info(format!("Found {} candidates in {source_url}", candidates.len()));

        // filter
        let candidate = self.pick_candidate(&candidates, campaign).await?;
        log.info(format!("Selected {}", candidate.link));

        // scrape
        let base_url = site_base(&source_url).unwrap_or_else(|| source_url.clone());
        let scraper = ArticleScraper::new(&self.fetcher, &self.config.scraper, timeout);
        let Some(scraped) = scraper.scrape(&base_url, &candidate.link).await else {
            log.warn(format!("Could not extract an article from {}", candidate.link));
            if campaign.skip_failed_candidates {
                self.record_skip(campaign, &candidate, log).await?;
            }
            return Err(PipelineError::ScrapeFailed(candidate.link));
        };
        log.info(format!("Scraped '{}'", scraped.title));

        // rewrite
        let seo = match campaign.processing_mode {
            ProcessingMode::AsIs => None,
            ProcessingMode::TranslatorSpin => {
                log.warn("Translator spin is not available, publishing the source as is");
                None
            }
            ProcessingMode::AiRewrite | ProcessingMode::AiUrlDirect => {
                let context = if campaign.processing_mode == ProcessingMode::AiRewrite {
                    let posts = self
                        .publisher
                        .recent_posts(self.config.pipeline.linking_context_posts)
                        .await?;
                    linking_context(&posts)
                } else {
                    String::new()
                };
                let request = prompt::build(&scraped, campaign, &context);
                log.info(format!(
                    "Calling model {} (temperature {})",
                    request.model, request.temperature
                ));
                match generate(&self.generator, &request).await {
                    Ok(result) => Some(result),
                    Err(e) => {
                        log.error(format!("Provider failed: {e}"));
                        return Err(e.into());
                    }
                }
            }
        };

        let (title, content_html) = final_text(seo.as_ref(), &scraped.title, &scraped.content_html);
        if strip_tags(&content_html).is_empty() {
            return Err(PipelineError::EmptyFinalContent);
        }
        let tokens_estimate = if seo.is_some() { estimate_tokens(&content_html) } else { 0 };

        // publish
        let article = ArticleRecord {
            campaign_id: campaign.id.clone(),
            source_url: candidate.link.clone(),
            title: title.clone(),
            content_html,
            image_url: scraped.image_url.clone(),
            slug: seo.as_ref().map(|s| s.slug.clone()).unwrap_or_default(),
            status: campaign.post_status,
            seo,
            processing_mode: campaign.processing_mode,
            created_at: Utc::now(),
        };
        let target_ref = self.publisher.publish(&article).await?;
        log.info(format!("Published to {target_ref}"));

        let record_id = self
            .store
            .append_record(ProcessedRecord {
                campaign_id: campaign.id.clone(),
                title: title.clone(),
                source_url: candidate.link.clone(),
                target_ref: target_ref.clone(),
                status: campaign.post_status.into(),
                tokens_estimate,
                created_at: article.created_at,
                messages: log.lines().to_vec(),
            })
            .await?;

        Ok(RunOutcome {
            record_id,
            title,
            source_url: candidate.link,
            target_ref,
        })
    }

    /// The oldest candidate not yet processed for this campaign.
    async fn pick_candidate(
        &self,
        candidates: &[SourceCandidate],
        campaign: &CampaignConfig,
    ) -> Result<SourceCandidate, PipelineError> {
        let mut processed = HashSet::new();
        for link in candidates.iter().map(|c| c.link.as_str()).unique() {
            if self.store.has_url_been_processed(&campaign.id, link).await? {
                processed.insert(link);
            }
        }
        debug!(already_processed = processed.len(), "Checked processed log");

        filter::select(candidates, campaign, |_, link| processed.contains(link))
            .ok_or_else(|| PipelineError::NoNewCandidates(campaign.id.clone()))
    }

    async fn record_skip(
        &self,
        campaign: &CampaignConfig,
        candidate: &SourceCandidate,
        log: &mut RunLog,
    ) -> Result<(), PipelineError> {
        log.info("Recording candidate as skipped");
        self.store
            .append_record(ProcessedRecord {
                campaign_id: campaign.id.clone(),
                title: String::new(),
                source_url: candidate.link.clone(),
                target_ref: String::new(),
                status: RecordStatus::Skipped,
                tokens_estimate: 0,
                created_at: Utc::now(),
                messages: log.lines().to_vec(),
            })
            .await?;
        Ok(())
    }

    /// Run a campaign up to `limit` times (at least once), stopping at the
    /// first failure.
    ///
    /// # Returns
    ///
    /// The number of articles produced.
    ///
    /// # Errors
    ///
    /// Only [`ConfigError::UnknownCampaign`]; run failures end the batch and
    /// are logged.
    #[instrument(level = "info", skip_all, fields(campaign = %campaign_id, limit = limit))]
    pub async fn run_batch(&self, campaign_id: &str, limit: usize) -> Result<usize, PipelineError> {
        let campaign = self.config.campaign(campaign_id)?;
        let mut produced = 0;

        for _ in 0..limit.max(1) {
            match self.run_campaign(campaign).await {
                Ok(_) => produced += 1,
                Err(e) if e.stops_batch_quietly() => {
                    info!(reason = %e, "Batch stopped");
                    break;
                }
                Err(e) => {
                    warn!(stage = %e.stage(), error = %e, "Batch aborted");
                    break;
                }
            }
        }
        info!(produced, "Batch finished");
        Ok(produced)
    }

    /// Walk every campaign once.
    ///
    /// Paused campaigns and campaigns at their `max_posts_limit` are
    /// skipped; the tick ends once `max_campaigns_per_tick` campaigns have
    /// produced something.
    #[instrument(level = "info", skip_all, fields(%now))]
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickSummary, PipelineError> {
        let mut summary = TickSummary {
            ticked_at: Some(now),
            ..TickSummary::default()
        };
        let cap = self.config.pipeline.max_campaigns_per_tick.max(1);

        for campaign in &self.config.campaigns {
            if campaign.status == CampaignStatus::Paused {
                debug!(campaign = %campaign.id, "Paused, skipping");
                summary.skipped_paused += 1;
                continue;
            }

            let mut limit = campaign.batch_size.max(1);
            if campaign.max_posts_limit > 0 {
                let produced = self.store.count_for_campaign(&campaign.id).await?;
                if produced >= campaign.max_posts_limit {
                    info!(campaign = %campaign.id, produced, "Post limit reached, skipping");
                    summary.skipped_at_limit += 1;
                    continue;
                }
                limit = limit.min(campaign.max_posts_limit - produced);
            }

            let produced = self.run_batch(&campaign.id, limit).await?;
            if produced > 0 {
                summary.campaigns_run += 1;
                summary.articles += produced;
                if summary.campaigns_run >= cap {
                    info!(cap, "Campaign cap reached for this tick");
                    break;
                }
            }
        }

        info!(
            campaigns = summary.campaigns_run,
            articles = summary.articles,
            "Tick finished"
        );
        Ok(summary)
    }

    /// Discover a source without running a campaign.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NoCandidates`] when nothing could be read.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn test_source(
        &self,
        url: &str,
        source_type: SourceType,
    ) -> Result<Vec<SourceCandidate>, PipelineError> {
        let candidates = Discoverer::new(&self.fetcher, self.fetch_timeout())
            .discover(url, source_type, TEST_SOURCE_ITEMS)
            .await;
        if candidates.is_empty() {
            return Err(PipelineError::NoCandidates(normalize_source_url(url)));
        }
        Ok(candidates)
    }
}

/// Model output wins; the scraped text fills whatever it left empty.
fn final_text(seo: Option<&AiResult>, title: &str, content_html: &str) -> (String, String) {
    let pick = |ai: Option<&String>, fallback: &str| match ai {
        Some(s) if !s.trim().is_empty() => s.clone(),
        _ => fallback.to_string(),
    };
    (
        pick(seo.map(|s| &s.title), title),
        pick(seo.map(|s| &s.content_html), content_html),
    )
}

fn estimate_tokens(content_html: &str) -> u64 {
    strip_tags(content_html).chars().count() as u64 / 4 + TOKEN_OVERHEAD
}
