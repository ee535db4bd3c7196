//! Profile-Harvester: a concurrent profile scraper
//!
//! This crate fetches profile listings and profile pages through a pluggable
//! page fetcher, extracts normalized records, drops duplicates and persists
//! the rest incrementally to CSV while many fetches run concurrently.

pub mod config;
pub mod harvester;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Profile-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] pipeline::PipelineError),

    #[error("Journal error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("URL error: {0}")]
    Url(#[from] crate::url::UrlError),

    #[error("Invalid input file {path}: {message}")]
    Input { path: String, message: String },

    #[error("Worker failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Profile-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvester::{FetchTask, Harvester, Scheduler, TaskOutcome, WorkItem};
pub use pipeline::{CsvSink, IdentityIndex, RecordSink, StagingPipeline};
pub use record::{Record, Scalar};
