//! URL handling module for Profile-Harvester
//!
//! This module builds people-directory search URLs, wraps target URLs for the
//! scraping proxy, and cleans up profile links found on search pages.

mod profile;
mod proxy;
mod search;

pub use profile::{profile_slug, resolve_profile_link};
pub use proxy::proxy_url;
pub use search::{search_url, split_keyword};

use thiserror::Error;

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid search keyword: '{0}'")]
    InvalidKeyword(String),
}

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;
