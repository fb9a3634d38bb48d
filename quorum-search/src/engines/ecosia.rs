//! Ecosia: Bing-backed results on its own markup.

use super::{no_locale, redirect, EngineProfile, ResultSelectors};
use crate::types::EngineId;

pub const PROFILE: EngineProfile = EngineProfile {
    engine: EngineId::Ecosia,
    base_url: "https://www.ecosia.org/search",
    query_param: "q",
    fixed_params: &[("method", "index")],
    locale_params: no_locale,
    selectors: ResultSelectors {
        result: "[data-test-id=\"mainline-result-web\"], .result",
        title: ".result-title, h2",
        link: "a.result-title, a[data-test-id=\"result-link\"], a[href]",
        description: ".result-snippet, .web-result__description, p",
    },
    decode_link: redirect::passthrough,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::html::extract_findings;
    use crate::types::{Language, Region};

    const MOCK_ECOSIA_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<section class="mainline">
  <article data-test-id="mainline-result-web">
    <a class="result-title" href="https://www.rust-lang.org/"><h2>Rust Programming Language</h2></a>
    <p class="web-result__description">A language empowering everyone.</p>
  </article>
  <article data-test-id="mainline-result-web">
    <a class="result-title" href="https://crates.io/"><h2>crates.io</h2></a>
  </article>
</section>
</body></html>"#;

    #[test]
    fn parse_mock_html_returns_results() {
        let findings = extract_findings(&PROFILE, "https://www.ecosia.org/search?q=rust", MOCK_ECOSIA_HTML, 10)
            .expect("should parse");
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].url, "https://www.rust-lang.org/");
        assert_eq!(findings[0].description, "A language empowering everyone.");
        assert_eq!(findings[1].description, crate::types::NO_DESCRIPTION);
    }

    #[test]
    fn index_method_precedes_query() {
        let url = PROFILE
            .search_url(PROFILE.base_url, "rust", Region::Fr, Language::Fr)
            .expect("url");
        assert_eq!(url.as_str(), "https://www.ecosia.org/search?method=index&q=rust");
    }
}
