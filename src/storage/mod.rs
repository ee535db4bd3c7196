//! Storage module for the run journal
//!
//! The journal records every harvest run and the terminal outcome of each
//! work item in a SQLite database. Scraped records themselves go to CSV via
//! the staging pipeline; the journal only tracks what happened.

mod schema;
mod sqlite;

pub use sqlite::SqliteJournal;

use thiserror::Error;

/// Errors that can occur during journal operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for journal operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Interface for run journal backends
pub trait RunJournal {
    /// Creates a new run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished with its final status and persisted record count
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        records_persisted: u64,
    ) -> StorageResult<()>;

    /// Records the terminal outcome of one work item
    fn record_outcome(&mut self, outcome: &OutcomeRecord) -> StorageResult<()>;

    /// Records many outcomes in one transaction
    fn record_outcomes(&mut self, outcomes: &[OutcomeRecord]) -> StorageResult<()>;

    fn get_outcomes(&self, run_id: i64) -> StorageResult<Vec<OutcomeRecord>>;

    fn count_outcomes(&self, run_id: i64, status: OutcomeStatus) -> StorageResult<u64>;
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub records_persisted: u64,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Terminal status of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded,
    Exhausted,
}

impl OutcomeStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Exhausted => "exhausted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(Self::Succeeded),
            "exhausted" => Some(Self::Exhausted),
            _ => None,
        }
    }
}

/// Terminal outcome of one work item within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub run_id: i64,
    /// `search` or `profiles`
    pub phase: String,
    pub item: String,
    pub url: String,
    pub status: OutcomeStatus,
    pub attempts: u32,
    pub admitted: u64,
    pub duplicates: u64,
    pub error: Option<String>,
}
