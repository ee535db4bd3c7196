use url::Url;

/// Returns the last non-empty path segment of a profile URL
///
/// `https://www.linkedin.com/in/bill-gates/?trk=x` yields `bill-gates`.
pub fn profile_slug(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Resolves a profile link against the page it was found on and drops its query
///
/// Returns None for empty, non-HTTP(S) or unparseable links.
pub fn resolve_profile_link(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut resolved = match Url::parse(base_url) {
        Ok(base) => base.join(href).ok()?,
        Err(_) => Url::parse(href).ok()?,
    };

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    resolved.set_query(None);
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_slug() {
        assert_eq!(
            profile_slug("https://www.linkedin.com/in/bill-gates?trk=x"),
            Some("bill-gates".to_string())
        );
        assert_eq!(
            profile_slug("https://www.linkedin.com/in/bill-gates/"),
            Some("bill-gates".to_string())
        );
    }

    #[test]
    fn test_profile_slug_without_path() {
        assert_eq!(profile_slug("https://www.linkedin.com/"), None);
        assert_eq!(profile_slug(""), None);
    }

    #[test]
    fn test_resolve_relative_link() {
        assert_eq!(
            resolve_profile_link("/in/jane-doe?trk=search", "https://www.linkedin.com/pub/dir?x=1"),
            Some("https://www.linkedin.com/in/jane-doe".to_string())
        );
    }

    #[test]
    fn test_resolve_absolute_link() {
        assert_eq!(
            resolve_profile_link(
                "https://uk.linkedin.com/in/jane-doe?trk=search",
                "https://www.linkedin.com/pub/dir"
            ),
            Some("https://uk.linkedin.com/in/jane-doe".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_other_schemes() {
        assert_eq!(
            resolve_profile_link("javascript:void(0)", "https://www.linkedin.com/"),
            None
        );
        assert_eq!(resolve_profile_link("  ", "https://www.linkedin.com/"), None);
    }
}
