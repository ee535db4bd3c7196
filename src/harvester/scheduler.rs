//! Fixed-size worker pool over a list of work items
//!
//! Workers pull the next unclaimed item from a shared cursor until the list
//! is exhausted. `run` returns once every item has a terminal outcome, or as
//! soon as a worker hits a fatal pipeline error; in that case the remaining
//! workers finish their current item and stop claiming new ones.

use crate::harvester::extract::Extractor;
use crate::harvester::fetcher::PageFetcher;
use crate::harvester::task::{FetchTask, TaskOutcome, WorkItem};
use crate::pipeline::RecordSink;
use crate::HarvestError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Terminal outcome of one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// Position of the item in the input list
    pub index: usize,
    pub item: WorkItem,
    pub outcome: TaskOutcome,
}

/// Per-item outcomes of a scheduler run, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub items: Vec<ItemReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|r| !r.outcome.is_success())
    }
}

/// Fans work items out across `worker_count` concurrent workers
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    worker_count: usize,
}

impl Scheduler {
    /// Creates a scheduler; a worker count of zero is treated as one
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Runs every work item through the fetch task
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - Every item reached success or exhausted its retries
    /// * `Err(HarvestError)` - A fatal error stopped the run
    pub async fn run<F, X, S>(
        &self,
        items: Vec<WorkItem>,
        task: Arc<FetchTask<F, X, S>>,
    ) -> Result<RunReport, HarvestError>
    where
        F: PageFetcher + 'static,
        X: Extractor + 'static,
        S: RecordSink + 'static,
    {
        if items.is_empty() {
            return Ok(RunReport::default());
        }

        let items = Arc::new(items);
        let cursor = Arc::new(AtomicUsize::new(0));
        let abort = Arc::new(AtomicBool::new(false));
        let workers = self.worker_count.min(items.len());

        tracing::info!("Processing {} items with {} workers", items.len(), workers);

        let mut join_set = JoinSet::new();
        for worker_id in 0..workers {
            let items = Arc::clone(&items);
            let cursor = Arc::clone(&cursor);
            let abort = Arc::clone(&abort);
            let task = Arc::clone(&task);

            join_set.spawn(async move {
                let mut reports = Vec::new();
                while !abort.load(Ordering::SeqCst) {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(item) = items.get(index) else {
                        break;
                    };

                    tracing::debug!("Worker {} claimed {}", worker_id, item.url);
                    match task.execute(item).await {
                        Ok(outcome) => reports.push(ItemReport {
                            index,
                            item: item.clone(),
                            outcome,
                        }),
                        Err(e) => {
                            abort.store(true, Ordering::SeqCst);
                            return Err(e);
                        }
                    }
                }
                Ok(reports)
            });
        }

        let mut reports = Vec::with_capacity(items.len());
        let mut first_error = None;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(worker_reports)) => reports.extend(worker_reports),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    abort.store(true, Ordering::SeqCst);
                    first_error.get_or_insert(HarvestError::Worker(e.to_string()));
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        reports.sort_by_key(|r| r.index);
        Ok(RunReport { items: reports })
    }
}
