//! Brave Search: an independent index behind a button-style captcha.

use super::{redirect, EngineProfile, ResultSelectors};
use crate::types::{EngineId, Language, Region};

pub const PROFILE: EngineProfile = EngineProfile {
    engine: EngineId::Brave,
    base_url: "https://search.brave.com/search",
    query_param: "q",
    fixed_params: &[("source", "web")],
    locale_params,
    selectors: ResultSelectors {
        result: ".snippet[data-type=\"web\"], #results .snippet",
        title: ".title, h3",
        link: "a[href]:not([href=\"#\"])",
        description: ".snippet-description, .generic-snippet .content",
    },
    decode_link: redirect::passthrough,
};

fn locale_params(region: Region, _language: Language) -> Vec<(&'static str, String)> {
    region
        .country_code()
        .map(|country| vec![("country", country.to_ascii_lowercase())])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::html::extract_findings;

    const MOCK_BRAVE_HTML: &str = r##"<!DOCTYPE html>
<html><body>
<div id="results">
  <div class="snippet" data-type="web">
    <a href="#">Skip</a>
    <a href="https://www.rust-lang.org/"><div class="title">Rust Programming Language</div></a>
    <div class="snippet-description">Reliable and efficient software.</div>
  </div>
  <div class="snippet" data-type="web">
    <a href="#"><div class="title">Only an anchor link</div></a>
  </div>
</div>
</body></html>"##;

    #[test]
    fn parse_mock_html_skips_fragment_links() {
        let findings = extract_findings(&PROFILE, "https://search.brave.com/search?q=rust", MOCK_BRAVE_HTML, 10)
            .expect("should parse");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].url, "https://www.rust-lang.org/");
        assert_eq!(findings[0].description, "Reliable and efficient software.");
    }

    #[test]
    fn country_param_is_lowercase() {
        assert_eq!(
            locale_params(Region::Jp, Language::Ja),
            vec![("country", "jp".to_string())]
        );
    }
}
