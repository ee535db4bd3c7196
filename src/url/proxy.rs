use super::{UrlError, UrlResult};
use crate::config::ProxyConfig;
use url::Url;

/// Wraps a target URL for the scraping proxy API
///
/// The proxy receives the target as the `url` query parameter together with
/// the API key and routing country.
///
/// # Example
///
/// ```
/// use profile_harvester::config::ProxyConfig;
/// use profile_harvester::url::proxy_url;
///
/// let proxy = ProxyConfig {
///     api_key: "key".to_string(),
///     endpoint: "https://proxy.scrapeops.io/v1/".to_string(),
///     country: "us".to_string(),
/// };
/// let url = proxy_url(&proxy, "https://www.linkedin.com/in/bill-gates").unwrap();
/// assert!(url.as_str().starts_with("https://proxy.scrapeops.io/v1/?api_key=key&url="));
/// ```
pub fn proxy_url(proxy: &ProxyConfig, target: &str) -> UrlResult<Url> {
    Url::parse_with_params(
        &proxy.endpoint,
        &[
            ("api_key", proxy.api_key.as_str()),
            ("url", target),
            ("country", proxy.country.as_str()),
        ],
    )
    .map_err(|e| UrlError::Parse(e.to_string()))
}
