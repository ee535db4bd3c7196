//! Configuration module for Profile-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`Config`] is built once at startup and passed explicitly to
//! everything that needs it.
//!
//! # Example
//!
//! ```no_run
//! use profile_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Workers: {}", config.harvester.worker_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetcherConfig, HarvesterConfig, OutputConfig, ProxyConfig, SearchConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
