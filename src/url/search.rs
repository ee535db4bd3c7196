use super::{UrlError, UrlResult};
use url::Url;

/// Tracking parameter the directory search form sends
const SEARCH_TRK: &str = "people-guest_people-search-bar_search-submit";

/// Splits a keyword like `"bill gates"` into first name and the remaining name
///
/// Everything after the first word is treated as the last name, so
/// `"jean claude van damme"` becomes `("jean", "claude van damme")`. A single
/// word yields an empty last name.
pub fn split_keyword(keyword: &str) -> UrlResult<(String, String)> {
    let mut words = keyword.split_whitespace();
    let first = words
        .next()
        .ok_or_else(|| UrlError::InvalidKeyword(keyword.to_string()))?;
    let last = words.collect::<Vec<_>>().join(" ");
    Ok((first.to_string(), last))
}

/// Builds the people-directory search URL for a keyword
///
/// # Example
///
/// ```
/// use profile_harvester::url::search_url;
/// use url::Url;
///
/// let base = Url::parse("https://www.linkedin.com").unwrap();
/// let url = search_url(&base, "bill gates").unwrap();
/// assert!(url.as_str().starts_with("https://www.linkedin.com/pub/dir?firstName=bill&lastName=gates"));
/// ```
pub fn search_url(base: &Url, keyword: &str) -> UrlResult<Url> {
    let (first, last) = split_keyword(keyword)?;

    let mut url = base
        .join("/pub/dir")
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    url.query_pairs_mut()
        .clear()
        .append_pair("firstName", &first)
        .append_pair("lastName", &last)
        .append_pair("trk", SEARCH_TRK);

    Ok(url)
}
