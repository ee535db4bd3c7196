use crate::config::types::{
    Config, FetcherConfig, HarvesterConfig, OutputConfig, ProxyConfig, SearchConfig, SiteConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on concurrent workers; each worker holds one live session
const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_fetcher_config(&config.fetcher)?;
    if let Some(proxy) = &config.proxy {
        validate_proxy_config(proxy)?;
    }
    validate_site_config(&config.site)?;
    validate_search_config(&config.search)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates concurrency, retry and batching limits
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.worker_count < 1 || config.worker_count > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and {}, got {}",
            MAX_WORKERS, config.worker_count
        )));
    }

    // max_attempts >= 0 is always true for u32, so no check needed

    if config.batch_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_threshold must be >= 1, got {}",
            config.batch_threshold
        )));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.api_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "proxy api_key cannot be empty".to_string(),
        ));
    }

    if config.country.trim().is_empty() {
        return Err(ConfigError::Validation(
            "proxy country cannot be empty".to_string(),
        ));
    }

    validate_http_url("proxy endpoint", &config.endpoint)
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)
}

/// Validates search keywords
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    for keyword in &config.keywords {
        if keyword.trim().is_empty() {
            return Err(ConfigError::Validation(
                "search keywords cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.search_path.is_empty() {
        return Err(ConfigError::Validation(
            "search_path cannot be empty".to_string(),
        ));
    }

    if config.profile_path.is_empty() {
        return Err(ConfigError::Validation(
            "profile_path cannot be empty".to_string(),
        ));
    }

    if config.search_path == config.profile_path {
        return Err(ConfigError::Validation(
            "search_path and profile_path must differ".to_string(),
        ));
    }

    if config.journal_path.is_empty() {
        return Err(ConfigError::Validation(
            "journal_path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.summary_path, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}
