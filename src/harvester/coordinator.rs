//! Harvest coordinator - two-phase run orchestration
//!
//! A run consists of up to two phases, executed in order:
//! - **Search**: every configured keyword becomes a people-directory search;
//!   the cards found are written to the search CSV
//! - **Profiles**: every row of the search CSV becomes a profile fetch; the
//!   details are written to the profile CSV
//!
//! Each phase owns its own staging pipeline and drains it before the next
//! phase starts. The run and every item outcome are recorded in the journal.

use crate::config::Config;
use crate::harvester::extract::{Extractor, ProfileExtractor, SearchCardExtractor};
use crate::harvester::fetcher::{HttpFetcher, PageFetcher};
use crate::harvester::scheduler::{RunReport, Scheduler};
use crate::harvester::task::{FetchTask, TaskOutcome, WorkItem};
use crate::pipeline::{CsvSink, PipelineStats, StagingPipeline};
use crate::storage::{OutcomeRecord, OutcomeStatus, RunJournal, RunStatus, SqliteJournal};
use crate::url::search_url;
use crate::HarvestError;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// One phase of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Search,
    Profiles,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Search => "search",
            Phase::Profiles => "profiles",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one phase did
#[derive(Debug, Clone)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub report: RunReport,
    pub stats: PipelineStats,
    /// CSV file the phase wrote to
    pub destination: String,
}

/// What a whole run did
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub run_id: i64,
    pub phases: Vec<PhaseSummary>,
}

impl HarvestSummary {
    pub fn records_persisted(&self) -> u64 {
        self.phases.iter().map(|p| p.stats.persisted).sum()
    }

    pub fn items_failed(&self) -> usize {
        self.phases.iter().map(|p| p.report.failed()).sum()
    }
}

/// A phase that stopped early, with what it had already written
#[derive(Debug)]
struct PhaseFailure {
    error: HarvestError,
    persisted: u64,
}

impl From<HarvestError> for PhaseFailure {
    fn from(error: HarvestError) -> Self {
        Self {
            error,
            persisted: 0,
        }
    }
}

/// Main harvest coordinator
pub struct Harvester<F: PageFetcher> {
    config: Arc<Config>,
    fetcher: Arc<F>,
    scheduler: Scheduler,
}

impl Harvester<HttpFetcher> {
    /// Creates a harvester that fetches over HTTP, through the proxy if one is configured
    pub fn new(config: Config) -> Self {
        let fetcher = HttpFetcher::new(config.fetcher.clone(), config.proxy.clone());
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: PageFetcher + 'static> Harvester<F> {
    pub fn with_fetcher(config: Config, fetcher: F) -> Self {
        let scheduler = Scheduler::new(config.harvester.worker_count);
        Self {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            scheduler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Builds one search work item per configured keyword
    pub fn search_items(&self) -> Result<Vec<WorkItem>, HarvestError> {
        let base = Url::parse(&self.config.site.base_url)?;

        self.config
            .search
            .keywords
            .iter()
            .map(|keyword| -> Result<WorkItem, HarvestError> {
                let url = search_url(&base, keyword)?;
                Ok(WorkItem::new(keyword.trim(), url.to_string()))
            })
            .collect()
    }

    /// Reads profile work items back from the search results file
    ///
    /// A missing file yields no items. Rows are keyed by `name`; repeated
    /// names and rows without a usable URL are skipped.
    pub fn profile_items(&self) -> Result<Vec<WorkItem>, HarvestError> {
        let path = Path::new(&self.config.output.search_path);
        if !path.exists() {
            tracing::warn!(
                "Search results file {} not found, no profiles to fetch",
                path.display()
            );
            return Ok(Vec::new());
        }

        let input_error = |message: String| HarvestError::Input {
            path: path.display().to_string(),
            message,
        };

        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| input_error(format!("missing '{}' column", name)))
        };
        let name_col = column("name")?;
        let url_col = column("url")?;

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for row in reader.records() {
            let row = row?;
            let name = row.get(name_col).unwrap_or_default().trim();
            let url = row.get(url_col).unwrap_or_default().trim();

            if Url::parse(url).is_err() {
                tracing::warn!("Skipping {}: invalid profile URL '{}'", name, url);
                continue;
            }
            if seen.insert(name.to_string()) {
                items.push(WorkItem::new(name, url));
            }
        }

        tracing::info!("Loaded {} profiles from {}", items.len(), path.display());
        Ok(items)
    }

    /// Runs the given phases in order and journals the outcome
    ///
    /// # Arguments
    ///
    /// * `phases` - Phases to run, in order
    /// * `config_hash` - Hash of the configuration file, stored with the run
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestSummary)` - Every phase finished and was drained
    /// * `Err(HarvestError)` - A fatal error stopped the run; it is journaled as failed
    pub async fn run(
        &self,
        phases: &[Phase],
        config_hash: &str,
    ) -> Result<HarvestSummary, HarvestError> {
        let mut journal = SqliteJournal::new(Path::new(&self.config.output.journal_path))?;
        let run_id = journal.create_run(config_hash)?;
        tracing::info!("Starting harvest run {}", run_id);

        let start_time = std::time::Instant::now();
        let mut completed = Vec::with_capacity(phases.len());

        for &phase in phases {
            let summary = match self.run_phase(phase).await {
                Ok(summary) => summary,
                Err(failure) => {
                    let persisted = completed
                        .iter()
                        .map(|p: &PhaseSummary| p.stats.persisted)
                        .sum::<u64>()
                        + failure.persisted;
                    if let Err(journal_err) = journal.finish_run(run_id, RunStatus::Failed, persisted)
                    {
                        tracing::error!("Failed to journal run {}: {}", run_id, journal_err);
                    }
                    tracing::error!(
                        "Harvest run {} failed in {} phase: {}",
                        run_id,
                        phase,
                        failure.error
                    );
                    return Err(failure.error);
                }
            };

            journal.record_outcomes(&outcome_records(run_id, &summary))?;
            completed.push(summary);
        }

        let summary = HarvestSummary {
            run_id,
            phases: completed,
        };
        journal.finish_run(run_id, RunStatus::Completed, summary.records_persisted())?;

        tracing::info!(
            "Harvest run {} completed: {} records persisted, {} items failed in {:?}",
            run_id,
            summary.records_persisted(),
            summary.items_failed(),
            start_time.elapsed()
        );

        Ok(summary)
    }

    async fn run_phase(&self, phase: Phase) -> Result<PhaseSummary, PhaseFailure> {
        let output = &self.config.output;
        match phase {
            Phase::Search => {
                let items = self.search_items()?;
                self.harvest(phase, items, SearchCardExtractor, &output.search_path)
                    .await
            }
            Phase::Profiles => {
                let items = self.profile_items()?;
                self.harvest(phase, items, ProfileExtractor, &output.profile_path)
                    .await
            }
        }
    }

    async fn harvest<X: Extractor + 'static>(
        &self,
        phase: Phase,
        items: Vec<WorkItem>,
        extractor: X,
        destination: &str,
    ) -> Result<PhaseSummary, PhaseFailure> {
        tracing::info!("Starting {} phase with {} items", phase, items.len());

        let settings = &self.config.harvester;
        let pipeline = Arc::new(StagingPipeline::new(
            CsvSink::new(destination),
            settings.batch_threshold,
        ));
        let task = Arc::new(FetchTask::new(
            Arc::clone(&self.fetcher),
            Arc::new(extractor),
            Arc::clone(&pipeline),
            settings.max_attempts,
        ));

        let report = match self.scheduler.run(items, task).await {
            Ok(report) => report,
            Err(e) => {
                // A failed sink cannot take the remainder; anything else can
                if !matches!(e, HarvestError::Pipeline(_)) {
                    if let Err(drain_err) = pipeline.drain() {
                        tracing::error!("Failed to drain {} pipeline: {}", phase, drain_err);
                    }
                }
                return Err(PhaseFailure {
                    error: e,
                    persisted: pipeline.stats().persisted,
                });
            }
        };

        let stats = pipeline.drain().map_err(|e| PhaseFailure {
            error: e.into(),
            persisted: pipeline.stats().persisted,
        })?;
        tracing::info!(
            "{} phase finished: {} of {} items succeeded, {} records persisted to {}",
            phase,
            report.succeeded(),
            report.items.len(),
            stats.persisted,
            destination
        );

        Ok(PhaseSummary {
            phase,
            report,
            stats,
            destination: destination.to_string(),
        })
    }
}

fn outcome_records(run_id: i64, summary: &PhaseSummary) -> Vec<OutcomeRecord> {
    summary
        .report
        .items
        .iter()
        .map(|report| {
            let (status, attempts, admitted, duplicates, error) = match &report.outcome {
                TaskOutcome::Succeeded {
                    attempts,
                    admitted,
                    duplicates,
                } => (OutcomeStatus::Succeeded, *attempts, *admitted, *duplicates, None),
                TaskOutcome::Exhausted {
                    attempts,
                    last_error,
                } => (OutcomeStatus::Exhausted, *attempts, 0, 0, Some(last_error.clone())),
            };
            OutcomeRecord {
                run_id,
                phase: summary.phase.as_str().to_string(),
                item: report.item.key.clone(),
                url: report.item.url.clone(),
                status,
                attempts,
                admitted,
                duplicates,
                error,
            }
        })
        .collect()
}
