//! Google: the best index, and the quickest to serve a reCAPTCHA.

use super::{redirect, EngineProfile, ResultSelectors};
use crate::types::{EngineId, Language, Region};

pub const PROFILE: EngineProfile = EngineProfile {
    engine: EngineId::Google,
    base_url: "https://www.google.com/search",
    query_param: "q",
    fixed_params: &[],
    locale_params,
    selectors: ResultSelectors {
        result: "div.g",
        title: "h3",
        link: "a[href]",
        description: ".VwiC3b, .IsZvec, [data-sncf]",
    },
    decode_link: redirect::google,
};

/// `hl` for interface language, `gl` for country.
fn locale_params(region: Region, language: Language) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(lang) = language.explicit() {
        params.push(("hl", lang.to_string()));
    }
    if let Some(country) = region.country_code() {
        params.push(("gl", country.to_ascii_lowercase()));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::html::extract_findings;

    const MOCK_GOOGLE_HTML: &str = r#"<!DOCTYPE html>
<html><head><title>rust - Google Search</title></head>
<body>
<div id="search">
  <div class="g">
    <a href="https://www.rust-lang.org/"><h3>Rust Programming Language</h3></a>
    <div class="VwiC3b">A language empowering everyone to build reliable software.</div>
  </div>
  <div class="g">
    <a href="/url?q=https://en.wikipedia.org/wiki/Rust&amp;sa=U"><h3>Rust - Wikipedia</h3></a>
    <div class="VwiC3b">Rust is a general-purpose programming language.</div>
  </div>
  <div class="g">
    <h3>Result without a link</h3>
  </div>
</div>
</body></html>"#;

    #[test]
    fn parse_mock_html_returns_results() {
        let findings = extract_findings(&PROFILE, "https://www.google.com/search?q=rust", MOCK_GOOGLE_HTML, 10)
            .expect("should parse");
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].url, "https://www.rust-lang.org/");
        assert!(findings[0].description.contains("reliable"));
        assert_eq!(findings[1].url, "https://en.wikipedia.org/wiki/Rust");
    }

    #[test]
    fn locale_params_for_explicit_locale() {
        let url = PROFILE
            .search_url(PROFILE.base_url, "rust", Region::Uk, Language::En)
            .expect("url");
        assert_eq!(url.as_str(), "https://www.google.com/search?q=rust&hl=en&gl=gb");
    }

    #[test]
    fn global_auto_adds_nothing() {
        assert!(locale_params(Region::Global, Language::Auto).is_empty());
    }
}
