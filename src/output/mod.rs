//! Output module for run summaries and reports
//!
//! This module handles:
//! - Building a summary of a journaled run
//! - Printing per-item outcomes and statistics to the console
//! - Writing a markdown summary file

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_run_summary, print_statistics};

use crate::storage::{OutcomeRecord, OutcomeStatus, RunJournal, StorageError};
use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("No harvest runs found in journal")]
    NoRuns,

    #[error("Journal error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Item totals for one phase of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseTotals {
    pub phase: String,
    pub succeeded: u64,
    pub exhausted: u64,
    pub admitted: u64,
    pub duplicates: u64,
}

/// Summary of a journaled run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub config_hash: String,
    pub records_persisted: u64,
    /// Phases in the order they ran
    pub phases: Vec<PhaseTotals>,
    /// Items that exhausted their retries
    pub failures: Vec<OutcomeRecord>,
}

impl RunSummary {
    pub fn total_items(&self) -> u64 {
        self.phases.iter().map(|p| p.succeeded + p.exhausted).sum()
    }

    /// Percentage of items that succeeded
    pub fn success_rate(&self) -> f64 {
        let total = self.total_items();
        if total == 0 {
            return 0.0;
        }
        let succeeded: u64 = self.phases.iter().map(|p| p.succeeded).sum();
        (succeeded as f64 / total as f64) * 100.0
    }
}

/// Builds a summary of the latest run in the journal
///
/// # Arguments
///
/// * `journal` - The journal containing run data
///
/// # Returns
///
/// * `Ok(RunSummary)` - Successfully generated summary
/// * `Err(OutputError)` - The journal is empty or could not be read
pub fn generate_summary(journal: &dyn RunJournal) -> OutputResult<RunSummary> {
    let run = journal.get_latest_run()?.ok_or(OutputError::NoRuns)?;

    let duration_seconds = match (
        run.started_at.parse::<chrono::DateTime<chrono::Utc>>(),
        run.finished_at
            .as_deref()
            .map(str::parse::<chrono::DateTime<chrono::Utc>>),
    ) {
        (Ok(started), Some(Ok(finished))) => Some((finished - started).num_seconds().max(0) as u64),
        _ => None,
    };

    let outcomes = journal.get_outcomes(run.id)?;
    let mut phases: Vec<PhaseTotals> = Vec::new();
    let mut failures = Vec::new();

    for outcome in outcomes {
        let index = match phases.iter().position(|p| p.phase == outcome.phase) {
            Some(index) => index,
            None => {
                phases.push(PhaseTotals {
                    phase: outcome.phase.clone(),
                    ..PhaseTotals::default()
                });
                phases.len() - 1
            }
        };
        let totals = &mut phases[index];
        totals.admitted += outcome.admitted;
        totals.duplicates += outcome.duplicates;

        match outcome.status {
            OutcomeStatus::Succeeded => totals.succeeded += 1,
            OutcomeStatus::Exhausted => {
                totals.exhausted += 1;
                failures.push(outcome);
            }
        }
    }

    Ok(RunSummary {
        run_id: run.id,
        started_at: run.started_at,
        finished_at: run.finished_at,
        duration_seconds,
        status: run.status.to_db_string().to_string(),
        config_hash: run.config_hash,
        records_persisted: run.records_persisted,
        phases,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{RunStatus, SqliteJournal};
    use std::path::Path;

    fn outcome(run_id: i64, phase: &str, item: &str, status: OutcomeStatus) -> OutcomeRecord {
        OutcomeRecord {
            run_id,
            phase: phase.to_string(),
            item: item.to_string(),
            url: format!("https://www.linkedin.com/in/{}", item),
            status,
            attempts: if status == OutcomeStatus::Succeeded { 1 } else { 4 },
            admitted: if status == OutcomeStatus::Succeeded { 2 } else { 0 },
            duplicates: 1,
            error: None,
        }
    }

    #[test]
    fn test_generate_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = SqliteJournal::new(&dir.path().join("journal.db")).unwrap();
        let run_id = journal.create_run("abc").unwrap();
        journal
            .record_outcomes(&[
                outcome(run_id, "search", "bill", OutcomeStatus::Succeeded),
                outcome(run_id, "search", "ada", OutcomeStatus::Exhausted),
                outcome(run_id, "profiles", "jane", OutcomeStatus::Succeeded),
            ])
            .unwrap();
        journal.finish_run(run_id, RunStatus::Completed, 4).unwrap();

        let summary = generate_summary(&journal).unwrap();

        assert_eq!(summary.run_id, run_id);
        assert_eq!(summary.status, "completed");
        assert_eq!(summary.records_persisted, 4);
        assert!(summary.duration_seconds.is_some());
        assert_eq!(summary.phases.len(), 2);
        assert_eq!(summary.phases[0].phase, "search");
        assert_eq!(summary.phases[0].succeeded, 1);
        assert_eq!(summary.phases[0].exhausted, 1);
        assert_eq!(summary.phases[0].duplicates, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].item, "ada");
        assert_eq!(summary.total_items(), 3);
    }

    #[test]
    fn test_empty_journal() {
        let dir = tempfile::tempdir().unwrap();
        let journal = SqliteJournal::new(Path::new(&dir.path().join("journal.db"))).unwrap();
        assert!(matches!(generate_summary(&journal), Err(OutputError::NoRuns)));
    }

    #[test]
    fn test_success_rate_without_items() {
        let summary = RunSummary {
            run_id: 1,
            started_at: String::new(),
            finished_at: None,
            duration_seconds: None,
            status: "running".to_string(),
            config_hash: String::new(),
            records_persisted: 0,
            phases: Vec::new(),
            failures: Vec::new(),
        };
        assert_eq!(summary.success_rate(), 0.0);
    }
}
