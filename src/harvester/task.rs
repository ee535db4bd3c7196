//! Fetch task: one work item driven through a bounded retry loop
//!
//! Each attempt opens its own fetch session, fetches and extracts, offers the
//! extracted records to the staging pipeline and closes the session before
//! the outcome is inspected. A failed session is therefore always released
//! before the next attempt starts or the task gives up. A session held by an
//! attempt that unwinds is released by its guard.

use crate::harvester::extract::Extractor;
use crate::harvester::fetcher::{PageFetcher, SessionGuard};
use crate::pipeline::{Admission, PipelineError, RecordSink, StagingPipeline};
use crate::HarvestError;
use std::sync::Arc;

/// One unit of work: a target URL and the key it is known by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Search keyword or profile name
    pub key: String,
    pub url: String,
}

impl WorkItem {
    pub fn new(key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
        }
    }
}

/// Outcome of a single fetch-and-extract attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    Success { admitted: u64, duplicates: u64 },
    /// Fetch or extraction failed; a fresh attempt may succeed
    Retryable(String),
    /// The pipeline could not persist a batch; the run must stop
    Fatal(PipelineError),
}

/// Terminal outcome of a fetch task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded {
        attempts: u32,
        admitted: u64,
        duplicates: u64,
    },
    Exhausted {
        attempts: u32,
        last_error: String,
    },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            TaskOutcome::Succeeded { attempts, .. } | TaskOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Fetches one work item, extracts its records and feeds the pipeline
pub struct FetchTask<F, X, S>
where
    F: PageFetcher,
    X: Extractor,
    S: RecordSink,
{
    fetcher: Arc<F>,
    extractor: Arc<X>,
    pipeline: Arc<StagingPipeline<S>>,
    max_attempts: u32,
}

impl<F, X, S> FetchTask<F, X, S>
where
    F: PageFetcher,
    X: Extractor,
    S: RecordSink,
{
    /// Creates a task runner
    ///
    /// `max_attempts` counts retries after the first attempt, so an item is
    /// tried at most `max_attempts + 1` times.
    pub fn new(
        fetcher: Arc<F>,
        extractor: Arc<X>,
        pipeline: Arc<StagingPipeline<S>>,
        max_attempts: u32,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            pipeline,
            max_attempts,
        }
    }

    pub fn pipeline(&self) -> &Arc<StagingPipeline<S>> {
        &self.pipeline
    }

    /// Runs the retry loop for one work item
    ///
    /// # Returns
    ///
    /// * `Ok(TaskOutcome::Succeeded)` - An attempt fetched and extracted the page
    /// * `Ok(TaskOutcome::Exhausted)` - Every attempt failed with a retryable error
    /// * `Err(HarvestError)` - The pipeline failed to persist records
    pub async fn execute(&self, item: &WorkItem) -> Result<TaskOutcome, HarvestError> {
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let outcome = match self.fetcher.open_session().await {
                Ok(session) => {
                    let mut session = SessionGuard::new(session);
                    let outcome = self.attempt(&mut session, item).await;
                    session.close().await;
                    outcome
                }
                Err(e) => AttemptOutcome::Retryable(e.to_string()),
            };

            match outcome {
                AttemptOutcome::Success {
                    admitted,
                    duplicates,
                } => {
                    tracing::debug!(
                        "Fetched {} on attempt {}: {} admitted, {} duplicates",
                        item.url,
                        attempts,
                        admitted,
                        duplicates
                    );
                    return Ok(TaskOutcome::Succeeded {
                        attempts,
                        admitted,
                        duplicates,
                    });
                }
                AttemptOutcome::Fatal(e) => {
                    tracing::error!("Stopping on {}: {}", item.url, e);
                    return Err(e.into());
                }
                AttemptOutcome::Retryable(error) => {
                    if attempts > self.max_attempts {
                        tracing::warn!(
                            "Giving up on {} after {} attempts: {}",
                            item.url,
                            attempts,
                            error
                        );
                        return Ok(TaskOutcome::Exhausted {
                            attempts,
                            last_error: error,
                        });
                    }

                    let retries_left = self.max_attempts + 1 - attempts;
                    tracing::info!(
                        "Error scraping {}: {}. Retrying ({} retries left)",
                        item.url,
                        error,
                        retries_left
                    );
                }
            }
        }
    }

    async fn attempt(
        &self,
        session: &mut SessionGuard<F::Session>,
        item: &WorkItem,
    ) -> AttemptOutcome {
        let document = match session.fetch(&item.url).await {
            Ok(document) => document,
            Err(e) => return AttemptOutcome::Retryable(e.to_string()),
        };

        let records = match self.extractor.extract(item, &document) {
            Ok(records) => records,
            Err(e) => return AttemptOutcome::Retryable(e.to_string()),
        };

        let mut admitted = 0;
        let mut duplicates = 0;
        for record in records {
            match self.pipeline.add(record) {
                Ok(Admission::Accepted) => admitted += 1,
                Ok(Admission::Duplicate) => duplicates += 1,
                Err(e) => return AttemptOutcome::Fatal(e),
            }
        }

        AttemptOutcome::Success {
            admitted,
            duplicates,
        }
    }
}
