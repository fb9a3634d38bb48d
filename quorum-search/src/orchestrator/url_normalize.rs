//! URL normalisation for cross-engine deduplication.
//!
//! Canonicalises URLs so that the same page reported by different engines,
//! with or without tracking parameters, a `www.` prefix, or a fragment,
//! compares as equal. The same function must be used everywhere URLs are
//! compared.

use url::Url;

/// Tracking query parameters that are stripped during normalisation.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
    "source",
    "referrer",
    "_ga",
];

/// Normalise a URL into its deduplication key.
///
/// Applies the following transformations:
///
/// 1. Lowercase scheme and host, drop default ports (done by parsing).
/// 2. Strip a leading `www.` from the host.
/// 3. Remove known tracking parameters (exact, case-sensitive key match);
///    remaining parameters keep their order and encoding.
/// 4. Remove the fragment.
///
/// The result is `scheme://host[:port]` + path + remaining query. Input
/// that cannot be parsed is returned unchanged. Normalising twice gives the
/// same result as normalising once.
///
/// # Examples
///
/// ```
/// use quorum_search::orchestrator::url_normalize::normalize_url;
///
/// let a = normalize_url("https://www.example.com/x?utm_source=a#top");
/// let b = normalize_url("https://example.com/x");
/// assert_eq!(a, b);
/// ```
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    parsed.set_fragment(None);

    if let Some(bare) = parsed.host_str().and_then(strip_www) {
        if !bare.is_empty() {
            // Only fails for hosts that cannot change (e.g. `cannot-be-a-base`).
            let _ = parsed.set_host(Some(&bare));
        }
    }

    let kept: Option<String> = parsed.query().map(|query| {
        query
            .split('&')
            .filter(|segment| !segment.is_empty() && !is_tracking(segment))
            .collect::<Vec<_>>()
            .join("&")
    });
    match kept {
        Some(q) if !q.is_empty() => parsed.set_query(Some(&q)),
        _ => parsed.set_query(None),
    }

    parsed.into()
}

/// Host without its `www.` prefix, if it had one. Repeated prefixes are all
/// removed so the result is stable under renormalisation.
fn strip_www(host: &str) -> Option<String> {
    host.starts_with("www.")
        .then(|| host.trim_start_matches("www.").to_string())
}

fn is_tracking(segment: &str) -> bool {
    let key = segment.split('=').next().unwrap_or(segment);
    TRACKING_PARAMS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_scheme_and_host() {
        let result = normalize_url("HTTPS://Example.COM/Path");
        assert_eq!(result, "https://example.com/Path");
    }

    #[test]
    fn strips_leading_www() {
        assert_eq!(
            normalize_url("https://www.example.com/x"),
            "https://example.com/x"
        );
    }

    #[test]
    fn keeps_other_subdomains() {
        assert_eq!(
            normalize_url("https://docs.example.com/x"),
            "https://docs.example.com/x"
        );
        assert_eq!(
            normalize_url("https://wwwexample.com/x"),
            "https://wwwexample.com/x"
        );
    }

    #[test]
    fn removes_default_https_port() {
        let result = normalize_url("https://example.com:443/path");
        assert_eq!(result, "https://example.com/path");
    }

    #[test]
    fn preserves_non_default_port() {
        let result = normalize_url("https://www.example.com:8080/path");
        assert_eq!(result, "https://example.com:8080/path");
    }

    #[test]
    fn removes_tracking_params() {
        let result = normalize_url(
            "https://example.com/page?q=rust&utm_source=google&fbclid=abc&gclid=xyz&msclkid=1&_ga=2",
        );
        assert_eq!(result, "https://example.com/page?q=rust");
    }

    #[test]
    fn tracking_key_match_is_case_sensitive() {
        assert_eq!(
            normalize_url("https://example.com/page?UTM_Source=x&Ref=y&SOURCE=z&q=test"),
            "https://example.com/page?UTM_Source=x&Ref=y&SOURCE=z&q=test"
        );
        assert_eq!(
            normalize_url("https://example.com/page?Ref=y&ref=z"),
            "https://example.com/page?Ref=y"
        );
    }

    #[test]
    fn removes_all_tracking_params_completely() {
        let url = "https://example.com/page?utm_source=a&utm_medium=b&utm_campaign=c&utm_term=d&utm_content=e&fbclid=f&gclid=g&msclkid=h&ref=i&source=j&referrer=k&_ga=l";
        assert_eq!(normalize_url(url), "https://example.com/page");
    }

    #[test]
    fn keeps_remaining_params_in_order() {
        let result = normalize_url("https://example.com/search?z=1&ref=x&a=2");
        assert_eq!(result, "https://example.com/search?z=1&a=2");
    }

    #[test]
    fn removes_fragment() {
        let result = normalize_url("https://example.com/page#section");
        assert_eq!(result, "https://example.com/page");
    }

    #[test]
    fn www_and_tracking_are_equivalent() {
        assert_eq!(
            normalize_url("https://www.example.com/x?utm_source=a"),
            normalize_url("https://example.com/x")
        );
    }

    #[test]
    fn trailing_slash_is_significant() {
        assert_ne!(
            normalize_url("https://example.com/path/"),
            normalize_url("https://example.com/path")
        );
    }

    #[test]
    fn invalid_url_returned_unchanged() {
        let input = "not a url at all";
        assert_eq!(normalize_url(input), input);
    }

    #[test]
    fn empty_string_returned_unchanged() {
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn normalisation_is_idempotent() {
        let samples = [
            "https://www.Example.com/a/b?utm_source=x&q=1#frag",
            "http://www.example.com:80/?ref=a",
            "https://example.com/search?q=hello+world&lang=en",
            "https://example.com/%7Euser/?a=%20b",
            "https://www.www.example.com/",
            "about:blank",
            "not a url",
            "",
        ];
        for url in samples {
            let once = normalize_url(url);
            assert_eq!(normalize_url(&once), once, "not idempotent for {url}");
        }
    }
}
