//! Harvester module for fetching and extracting profile data
//!
//! This module contains the concurrent scraping engine, including:
//! - Scoped fetch sessions over HTTP
//! - Extraction rules for search cards and profile pages
//! - The per-item retry loop
//! - The fixed-size worker pool
//! - Two-phase run coordination

mod coordinator;
mod extract;
mod fetcher;
mod scheduler;
mod task;

pub use coordinator::{HarvestSummary, Harvester, Phase, PhaseSummary};
pub use extract::{ExtractError, Extractor, ProfileExtractor, SearchCardExtractor};
pub use fetcher::{
    build_http_client, Document, FetchError, FetchSession, HttpFetcher, HttpSession, PageFetcher,
    SessionGuard,
};
pub use scheduler::{ItemReport, RunReport, Scheduler};
pub use task::{AttemptOutcome, FetchTask, TaskOutcome, WorkItem};
