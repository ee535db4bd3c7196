//! Staging pipeline for scraped records
//!
//! This module handles everything between extraction and durable storage:
//! - Deduplication by record identity
//! - In-memory staging of admitted records
//! - Batched, append-only writes to a CSV file

mod identity;
mod sink;
mod staging;

pub use identity::IdentityIndex;
pub use sink::{CsvSink, RecordSink, SinkError};
pub use staging::{Admission, PipelineStats, StagingPipeline};

use thiserror::Error;

/// Errors surfaced by the staging pipeline
///
/// Every variant is fatal to a harvest run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to persist batch of {batch_size} records: {source}")]
    Sink {
        batch_size: usize,
        #[source]
        source: SinkError,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
