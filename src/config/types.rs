use serde::Deserialize;

/// Main configuration structure for Profile-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub site: SiteConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

/// Concurrency, retry and batching configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvesterConfig {
    /// Number of concurrent fetch workers
    #[serde(rename = "worker-count")]
    pub worker_count: usize,

    /// Retries after the first failed attempt of an item
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Number of buffered records that triggers a write
    #[serde(rename = "batch-threshold")]
    pub batch_threshold: usize,
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    /// Overall request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Scraping proxy API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// API key for the proxy service
    #[serde(rename = "api-key")]
    pub api_key: String,

    /// Proxy endpoint; the target URL is passed as a query parameter
    #[serde(default = "default_proxy_endpoint")]
    pub endpoint: String,

    /// Country the proxy should route requests through
    #[serde(default = "default_country")]
    pub country: String,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the people directory
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Search phase input
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Names to search for, e.g. "bill gates"
    pub keywords: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// CSV file for search results
    #[serde(rename = "search-path")]
    pub search_path: String,

    /// CSV file for profile details
    #[serde(rename = "profile-path")]
    pub profile_path: String,

    /// SQLite run journal
    #[serde(rename = "journal-path")]
    pub journal_path: String,

    /// Optional markdown summary written after each run
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_proxy_endpoint() -> String {
    "https://proxy.scrapeops.io/v1/".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_base_url() -> String {
    "https://www.linkedin.com".to_string()
}
